//! Argon2id passphrase stretching (§4.3).

use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

pub const KDF_TIME_COST: u32 = 3;
pub const KDF_MEMORY_COST: u32 = 131_072; // KiB = 128 MiB
pub const KDF_PARALLELISM: u32 = 1;
pub const DERIVED_KEY_LEN: usize = 32;

/// `Argon2id(secret=master, salt, time_cost, memory_cost, parallelism, hash_len=32)`.
pub fn argon2id(
    master: &[u8],
    salt: &[u8],
    time_cost: u32,
    memory_cost: u32,
    parallelism: u32,
) -> anyhow::Result<Zeroizing<[u8; DERIVED_KEY_LEN]>> {
    let params = Params::new(memory_cost, time_cost, parallelism, Some(DERIVED_KEY_LEN))
        .map_err(|e| anyhow::anyhow!("argon2 params: {e}"))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut out = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
    argon
        .hash_password_into(master, salt, out.as_mut())
        .map_err(|e| anyhow::anyhow!("argon2 derive: {e}"))?;
    Ok(out)
}

/// Default-parameter convenience wrapper used for both the vault KEK and the
/// per-derivation anchor (§4.3).
pub fn argon2id_default(master: &[u8], salt: &[u8]) -> anyhow::Result<Zeroizing<[u8; DERIVED_KEY_LEN]>> {
    argon2id(master, salt, KDF_TIME_COST, KDF_MEMORY_COST, KDF_PARALLELISM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_fixed_inputs() {
        let salt = [7u8; 16];
        let a = argon2id_default(b"master", &salt).unwrap();
        let b = argon2id_default(b"master", &salt).unwrap();
        assert_eq!(*a, *b);
    }

    #[test]
    fn differs_with_salt() {
        let a = argon2id_default(b"master", &[1u8; 16]).unwrap();
        let b = argon2id_default(b"master", &[2u8; 16]).unwrap();
        assert_ne!(*a, *b);
    }
}
