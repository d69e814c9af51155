//! Vault: deterministic plaintext schema, atomic persistence (§4.9, §6).

use crate::aead;
use crate::capsule::{make_capsule, Capsule};
use crate::error::PwgenError;
use crate::kdf;
use crate::policy::Policy;
use crate::primitives::{b64d, b64e, now_iso};
use crate::site_id::normalize_site_id;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

pub const VAULT_VERSION: &str = "pwgen_vault_v1";
pub const ALGO_VERSION: &str = crate::derive::SUPPORTED_ALGO_VERSION;

#[derive(Debug, Clone, Copy)]
pub struct KdfParams {
    pub t: u32,
    pub m: u32,
    pub p: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        KdfParams {
            t: kdf::KDF_TIME_COST,
            m: kdf::KDF_MEMORY_COST,
            p: kdf::KDF_PARALLELISM,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KdfSection {
    alg: String,
    t: u32,
    m: u32,
    p: u32,
    salt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AeadSection {
    alg: String,
    nonce: String,
}

/// On-disk `VaultFile` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VaultFile {
    version: String,
    kdf: KdfSection,
    aead: AeadSection,
    ciphertext: String,
    written_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgoInfo {
    pub version: String,
}

/// `SiteRecord` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRecord {
    pub site_id: String,
    pub login: String,
    pub v: String,
    pub c: u64,
    pub rseed: String,
    pub policy: Policy,
    pub created: String,
    #[serde(default)]
    pub notes: String,
}

impl SiteRecord {
    pub fn rseed_bytes(&self) -> Result<[u8; 16], PwgenError> {
        let raw = hex::decode(&self.rseed)
            .map_err(|e| PwgenError::VaultFormat(format!("rseed not hex: {e}")))?;
        raw.try_into()
            .map_err(|_| PwgenError::VaultFormat("rseed must be 16 bytes".into()))
    }
}

/// `VaultPlaintext` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultPlaintext {
    pub capsule: String,
    pub created: String,
    pub updated: String,
    pub algo: AlgoInfo,
    pub site_id_policy: String,
    pub sites: HashMap<String, SiteRecord>,
}

impl VaultPlaintext {
    pub fn capsule_bytes(&self) -> Result<Capsule, PwgenError> {
        let raw = b64d(&self.capsule).map_err(|e| PwgenError::VaultFormat(e.to_string()))?;
        raw.try_into()
            .map_err(|_| PwgenError::VaultFormat("capsule must be 32 bytes".into()))
    }
}

fn composite_key(site_id: &str, login: &str) -> String {
    format!("{site_id}|{login}")
}

/// `init_vault`: writes a fresh `VaultFile`; fails if `path` already exists (§6).
pub fn init_vault(
    path: impl AsRef<Path>,
    master: &[u8],
    kdf_params: KdfParams,
    beacon: Option<&str>,
) -> Result<VaultPlaintext, PwgenError> {
    let path = path.as_ref();
    if path.exists() {
        return Err(PwgenError::IOFailure(format!(
            "vault already exists: {}",
            path.display()
        )));
    }
    let capsule = make_capsule(beacon);
    let now = now_iso();
    let plaintext = VaultPlaintext {
        capsule: b64e(&capsule),
        created: now.clone(),
        updated: now,
        algo: AlgoInfo {
            version: ALGO_VERSION.to_string(),
        },
        site_id_policy: "psl".to_string(),
        sites: HashMap::new(),
    };
    write_plaintext(path, master, &plaintext, kdf_params)?;
    Ok(plaintext)
}

/// `open_vault`: read, parse, decrypt, parse inner JSON (§4.9).
pub fn open_vault(
    path: impl AsRef<Path>,
    master: &[u8],
) -> Result<(VaultPlaintext, KdfParams), PwgenError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let file: VaultFile = serde_json::from_slice(&bytes)?;
    if file.version != VAULT_VERSION {
        return Err(PwgenError::VaultFormat(format!(
            "unsupported vault version: {}",
            file.version
        )));
    }

    let salt = b64d(&file.kdf.salt).map_err(|e| PwgenError::VaultFormat(e.to_string()))?;
    let nonce_bytes = b64d(&file.aead.nonce).map_err(|e| PwgenError::VaultFormat(e.to_string()))?;
    let nonce: [u8; aead::NONCE_LEN] = nonce_bytes
        .try_into()
        .map_err(|_| PwgenError::VaultFormat("nonce must be 12 bytes".into()))?;
    let ciphertext = b64d(&file.ciphertext).map_err(|e| PwgenError::VaultFormat(e.to_string()))?;

    let key: Zeroizing<[u8; 32]> = kdf::argon2id(master, &salt, file.kdf.t, file.kdf.m, file.kdf.p)
        .map_err(|e| PwgenError::IOFailure(format!("kdf: {e}")))?;
    let plaintext_bytes = aead::decrypt(&*key, &nonce, &ciphertext)?;
    let plaintext: VaultPlaintext = serde_json::from_slice(&plaintext_bytes)?;

    Ok((
        plaintext,
        KdfParams {
            t: file.kdf.t,
            m: file.kdf.m,
            p: file.kdf.p,
        },
    ))
}

/// `save_vault`: atomic overwrite with a fresh salt and nonce (§4.9).
pub fn save_vault(
    path: impl AsRef<Path>,
    master: &[u8],
    plaintext: &VaultPlaintext,
    kdf_params: KdfParams,
) -> Result<(), PwgenError> {
    let mut plaintext = plaintext.clone();
    plaintext.updated = now_iso();
    write_plaintext(path.as_ref(), master, &plaintext, kdf_params)
}

fn write_plaintext(
    path: &Path,
    master: &[u8],
    plaintext: &VaultPlaintext,
    kdf_params: KdfParams,
) -> Result<(), PwgenError> {
    let inner = serde_json::to_vec(plaintext)?;

    let mut salt = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut salt);
    let key: Zeroizing<[u8; 32]> =
        kdf::argon2id(master, &salt, kdf_params.t, kdf_params.m, kdf_params.p)
            .map_err(|e| PwgenError::IOFailure(format!("kdf: {e}")))?;
    let nonce = aead::generate_nonce();
    let ciphertext = aead::encrypt(&*key, &nonce, &inner)
        .map_err(|e| PwgenError::IOFailure(format!("aead encrypt: {e}")))?;

    let file = VaultFile {
        version: VAULT_VERSION.to_string(),
        kdf: KdfSection {
            alg: "argon2id".to_string(),
            t: kdf_params.t,
            m: kdf_params.m,
            p: kdf_params.p,
            salt: b64e(&salt),
        },
        aead: AeadSection {
            alg: "chacha20poly1305".to_string(),
            nonce: b64e(&nonce),
        },
        ciphertext: b64e(&ciphertext),
        written_at: now_iso(),
    };

    let outer = serde_json::to_vec_pretty(&file)?;
    atomic_write(path, &outer)?;
    debug!(path = %path.display(), sites = plaintext.sites.len(), "vault saved");
    Ok(())
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), PwgenError> {
    let tmp: PathBuf = {
        let mut p = path.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    };
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

/// `add_site`: fails if the composite key already exists (§6).
pub fn add_site(
    plaintext: &mut VaultPlaintext,
    site_input: &str,
    login: &str,
    policy: Policy,
    notes: &str,
) -> Result<String, PwgenError> {
    policy.validate()?;
    let site_id = normalize_site_id(site_input);
    let login = login.trim().to_string();
    let key = composite_key(&site_id, &login);
    if plaintext.sites.contains_key(&key) {
        return Err(PwgenError::RecordExists);
    }
    let mut rseed = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut rseed);
    let record = SiteRecord {
        site_id: site_id.clone(),
        login,
        v: ALGO_VERSION.to_string(),
        c: 0,
        rseed: hex::encode(rseed),
        policy,
        created: now_iso(),
        notes: notes.to_string(),
    };
    plaintext.sites.insert(key.clone(), record);
    Ok(key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateMode {
    Counter,
    Rseed,
}

/// `rotate`: bump the counter or draw a fresh `rseed` (§4.10 state machine, §8).
pub fn rotate(
    plaintext: &mut VaultPlaintext,
    site_input: &str,
    login: &str,
    mode: RotateMode,
) -> Result<(), PwgenError> {
    let site_id = normalize_site_id(site_input);
    let login = login.trim();
    let key = composite_key(&site_id, login);
    let record = plaintext
        .sites
        .get_mut(&key)
        .ok_or(PwgenError::RecordMissing)?;
    match mode {
        RotateMode::Counter => {
            record.c += 1;
        }
        RotateMode::Rseed => {
            let mut rseed = [0u8; 16];
            rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut rseed);
            record.rseed = hex::encode(rseed);
            record.c = 0;
        }
    }
    record.v = ALGO_VERSION.to_string();
    Ok(())
}

/// `list_sites`: records sorted by composite key, mirroring `cmd_list`.
pub fn list_sites(plaintext: &VaultPlaintext) -> Vec<(&String, &SiteRecord)> {
    let mut entries: Vec<_> = plaintext.sites.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

/// `show_site`: single-record lookup, mirroring `cmd_show`.
pub fn show_site<'a>(
    plaintext: &'a VaultPlaintext,
    site_input: &str,
    login: &str,
) -> Result<&'a SiteRecord, PwgenError> {
    let site_id = normalize_site_id(site_input);
    let key = composite_key(&site_id, login.trim());
    plaintext.sites.get(&key).ok_or(PwgenError::RecordMissing)
}

/// `show_capsule`: base64url of the raw capsule, mirroring `cmd_capsule`.
pub fn show_capsule(plaintext: &VaultPlaintext) -> String {
    plaintext.capsule.clone()
}
