use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pwgen_core::derive::derive_with_retries;
use pwgen_core::paths::default_vault_path;
use pwgen_core::policy::{ClassKind, Policy, Profile};
use pwgen_core::primitives::constant_time_eq;
use pwgen_core::vault::{
    self, add_site, list_sites, rotate, show_capsule, show_site, KdfParams, RotateMode,
    VaultPlaintext,
};
use std::path::PathBuf;
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "pwgen")]
#[command(about = "Deterministic per-site password derivation engine with an encrypted vault")]
struct Cli {
    /// Path to the vault (defaults to the platform data dir, overridable via PWGEN_VAULT_PATH)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new vault and entropy capsule
    Init {
        #[arg(long)]
        beacon: Option<String>,
        #[arg(long, default_value_t = pwgen_core::kdf::KDF_TIME_COST)]
        time_cost: u32,
        #[arg(long, default_value_t = pwgen_core::kdf::KDF_MEMORY_COST)]
        mem_cost: u32,
        #[arg(long, default_value_t = pwgen_core::kdf::KDF_PARALLELISM)]
        parallel: u32,
    },
    /// Add a site record (first rseed generation, c=0)
    Add {
        /// Domain or URL
        #[arg(long)]
        site: String,
        /// Login/account at the site
        #[arg(long)]
        login: String,
        /// Use a named policy profile instead of --length/--classes/--forbid
        #[arg(long)]
        profile: Option<String>,
        #[arg(long, default_value_t = 24)]
        length: u32,
        #[arg(long, default_value = "lower,upper,digits,symbols")]
        classes: String,
        #[arg(long)]
        forbid: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Generate the password for a site/login
    Get {
        #[arg(long)]
        site: String,
        #[arg(long)]
        login: String,
        /// Override the stored length for this derivation only
        #[arg(long)]
        length: Option<u32>,
        /// Override the stored classes for this derivation only
        #[arg(long)]
        classes: Option<String>,
        /// Override the stored forbid set for this derivation only
        #[arg(long)]
        forbid: Option<String>,
    },
    /// Rotate a record: bump the counter or draw a fresh rseed
    Rotate {
        #[arg(long)]
        site: String,
        #[arg(long)]
        login: String,
        #[arg(long, value_enum, default_value_t = RotateModeArg::Counter)]
        mode: RotateModeArg,
    },
    /// List all sites in the vault
    List,
    /// Show detailed metadata for a site record
    Show {
        #[arg(long)]
        site: String,
        #[arg(long)]
        login: String,
    },
    /// Print the vault's entropy capsule (base64url)
    Capsule,
}

#[derive(Clone, Copy, ValueEnum)]
enum RotateModeArg {
    Counter,
    Rseed,
}

impl From<RotateModeArg> for RotateMode {
    fn from(mode: RotateModeArg) -> Self {
        match mode {
            RotateModeArg::Counter => RotateMode::Counter,
            RotateModeArg::Rseed => RotateMode::Rseed,
        }
    }
}

fn parse_classes(s: &str) -> Result<Vec<ClassKind>> {
    s.split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(|part| match part {
            "lower" => Ok(ClassKind::Lower),
            "upper" => Ok(ClassKind::Upper),
            "digits" => Ok(ClassKind::Digits),
            "symbols" => Ok(ClassKind::Symbols),
            other => Err(anyhow!("unknown class: {other}")),
        })
        .collect()
}

fn default_forbid() -> Vec<char> {
    vec!['"', '\'', '`', ' ']
}

fn resolve_vault_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.vault {
        Some(path) => Ok(path.clone()),
        None => default_vault_path(),
    }
}

fn prompt_master(prompt: &str) -> Result<Zeroizing<String>> {
    Ok(Zeroizing::new(rpassword::prompt_password(prompt)?))
}

fn load_vault(path: &std::path::Path) -> Result<(VaultPlaintext, KdfParams, Zeroizing<String>)> {
    if !path.exists() {
        return Err(anyhow!("vault not found: {}", path.display()));
    }
    let master = prompt_master("Master passphrase: ")?;
    let (plaintext, kdf_params) = vault::open_vault(path, master.as_bytes())
        .context("failed to open vault")?;
    Ok((plaintext, kdf_params, master))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let vault_path = resolve_vault_path(&cli)?;

    match cli.command {
        Commands::Init {
            beacon,
            time_cost,
            mem_cost,
            parallel,
        } => {
            if vault_path.exists() {
                return Err(anyhow!("vault already exists: {}", vault_path.display()));
            }
            let master1 = prompt_master("Enter master passphrase: ")?;
            let master2 = prompt_master("Repeat master passphrase: ")?;
            if master1.is_empty() || !constant_time_eq(master1.as_bytes(), master2.as_bytes()) {
                return Err(anyhow!("master passphrases do not match or are empty"));
            }
            let kdf_params = KdfParams {
                t: time_cost,
                m: mem_cost,
                p: parallel,
            };
            vault::init_vault(&vault_path, master1.as_bytes(), kdf_params, beacon.as_deref())?;
            tracing::info!(path = %vault_path.display(), "vault created");
            println!("Vault created at {}", vault_path.display());
        }

        Commands::Add {
            site,
            login,
            profile,
            length,
            classes,
            forbid,
            notes,
        } => {
            let (mut plaintext, kdf_params, master) = load_vault(&vault_path)?;
            let policy: Policy = if let Some(name) = profile {
                let profile = Profile::parse(&name)
                    .ok_or_else(|| anyhow!("unknown profile: {name}"))?;
                profile.into()
            } else {
                let class_list = parse_classes(&classes)?;
                let forbid_chars = forbid
                    .map(|s| s.chars().collect())
                    .unwrap_or_else(default_forbid);
                Policy::new(length, class_list, forbid_chars)
            };
            let key = add_site(&mut plaintext, &site, &login, policy, &notes)?;
            vault::save_vault(&vault_path, master.as_bytes(), &plaintext, kdf_params)?;
            println!("Added: {key}");
        }

        Commands::Get {
            site,
            login,
            length,
            classes,
            forbid,
        } => {
            let (plaintext, _kdf_params, master) = load_vault(&vault_path)?;
            let record = show_site(&plaintext, &site, &login)?.clone();
            let capsule = plaintext.capsule_bytes()?;

            let mut policy = record.policy.clone();
            if let Some(length) = length {
                policy.length = length;
            }
            if let Some(classes) = classes {
                policy.classes = parse_classes(&classes)?;
            }
            if let Some(forbid) = forbid {
                policy.forbid = forbid.chars().collect();
            }

            let (password, used_c) = derive_with_retries(
                master.as_bytes(),
                Some(&capsule),
                &record.site_id,
                &record.login,
                &policy,
                &record.v,
                record.c,
                &record.rseed_bytes()?,
            )?;
            println!("{password}");
            if used_c != record.c {
                eprintln!(
                    "(internal counter used to satisfy policy: c={used_c}, stored c={})",
                    record.c
                );
            }
        }

        Commands::Rotate { site, login, mode } => {
            let (mut plaintext, kdf_params, master) = load_vault(&vault_path)?;
            rotate(&mut plaintext, &site, &login, mode.into())?;
            vault::save_vault(&vault_path, master.as_bytes(), &plaintext, kdf_params)?;
            println!("Rotated.");
        }

        Commands::List => {
            let (plaintext, _, _) = load_vault(&vault_path)?;
            let entries = list_sites(&plaintext);
            if entries.is_empty() {
                println!("Empty.");
            } else {
                for (_, record) in entries {
                    let classes = record
                        .policy
                        .classes
                        .iter()
                        .map(|c| format!("{c:?}").to_lowercase())
                        .collect::<Vec<_>>()
                        .join(",");
                    println!(
                        "{}\t{}\tlen={}\tclasses={classes}\tc={}",
                        record.site_id, record.login, record.policy.length, record.c
                    );
                }
            }
        }

        Commands::Show { site, login } => {
            let (plaintext, _, _) = load_vault(&vault_path)?;
            let record = show_site(&plaintext, &site, &login)?;
            println!("{}", serde_json::to_string_pretty(record)?);
        }

        Commands::Capsule => {
            let (plaintext, _, _) = load_vault(&vault_path)?;
            println!("{}", show_capsule(&plaintext));
        }
    }

    Ok(())
}
