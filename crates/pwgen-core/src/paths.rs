//! Default vault path resolution (§6 "Default vault path").

use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "pwgen";
pub const APP_NAME: &str = "pwgen";
pub const VAULT_PATH_ENV: &str = "PWGEN_VAULT_PATH";

pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("cannot determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

/// `~/.pwgen_vault.json` (or OS-equivalent), overridable by `PWGEN_VAULT_PATH`.
pub fn default_vault_path() -> anyhow::Result<PathBuf> {
    if let Ok(override_path) = std::env::var(VAULT_PATH_ENV) {
        return Ok(PathBuf::from(override_path));
    }
    Ok(data_dir()?.join("pwgen_vault.json"))
}
