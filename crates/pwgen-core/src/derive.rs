//! The password-derivation pipeline: passphrase stretching, capsule mixing,
//! key expansion, alphabet sampling, policy-constrained output (§4.4, §4.7).

use crate::drbg::Drbg;
use crate::error::PwgenError;
use crate::kdf;
use crate::key_schedule::{build_context, hkdf_expand, hkdf_extract};
use crate::policy::{build_alphabet, satisfies_classes, Policy};
use crate::sampler::fisher_yates_shuffle;
use sha2::{Digest, Sha512};
use tracing::warn;
use zeroize::Zeroizing;

pub const SUPPORTED_ALGO_VERSION: &str = "sha512-v1";
const DEFAULT_MAX_TRIES: u32 = 8;

fn supported(v: &str) -> Result<(), PwgenError> {
    if v != SUPPORTED_ALGO_VERSION {
        return Err(PwgenError::AlgoVersionUnsupported(v.to_string()));
    }
    Ok(())
}

/// One full pass of the pipeline for a single `(site_id, login, c)` triple.
/// `derive` is pure over its inputs — no I/O, no retry.
pub fn derive_once(
    master: &[u8],
    capsule: Option<&[u8]>,
    site_id: &str,
    login: &str,
    policy: &Policy,
    v: &str,
    c: u64,
    rseed: &[u8; 16],
) -> Result<String, PwgenError> {
    supported(v)?;

    let policy_json = policy.canonical_json();
    let context = build_context(v, site_id, login, &policy_json, c, rseed);

    let base_salt = {
        let mut hasher = Sha512::new();
        hasher.update(b"salt|");
        hasher.update(&context);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest[..32]);
        out
    };

    let mut prk: Zeroizing<[u8; 32]> = kdf::argon2id_default(master, &base_salt)
        .map_err(|e| PwgenError::IOFailure(format!("kdf: {e}")))?;

    if let Some(cap) = capsule {
        if cap.len() >= 32 {
            prk = Zeroizing::new(*hkdf_extract(&*prk, cap));
        }
    }

    let k_pwd = hkdf_expand(&*prk, &[b"password|".as_slice(), &context].concat(), 32);
    let k_perm = hkdf_expand(&*prk, &[b"alphabet|".as_slice(), &context].concat(), 32);

    let (allow, _required_sets) = build_alphabet(policy)?;
    let mut alphabet = allow;
    let mut k_perm_arr = [0u8; 32];
    k_perm_arr.copy_from_slice(&k_perm);
    fisher_yates_shuffle(&mut alphabet, &k_perm_arr);

    let length = policy.length as usize;
    let m = alphabet.len();
    let t = (256 / m) * m;

    let mut k_pwd_arr = [0u8; 32];
    k_pwd_arr.copy_from_slice(&k_pwd);
    let mut stream = Drbg::new(&k_pwd_arr);

    let mut out: Vec<char> = Vec::with_capacity(length);
    while out.len() < length {
        let b = stream.next_byte() as usize;
        if b < t {
            out.push(alphabet[b % m]);
        }
    }

    // Reuse K_pwd for the positional shuffle — intentional per §4.7 step 4.
    fisher_yates_shuffle(&mut out, &k_pwd_arr);

    Ok(out.into_iter().collect())
}

/// Bounded retry loop (§4.7): on class-coverage failure, try `c + i` for
/// `i in [0, max_tries)`. The stored counter is never mutated; the counter
/// actually used is returned so the caller can surface a warning.
pub fn derive_with_retries(
    master: &[u8],
    capsule: Option<&[u8]>,
    site_id: &str,
    login: &str,
    policy: &Policy,
    v: &str,
    c: u64,
    rseed: &[u8; 16],
) -> Result<(String, u64), PwgenError> {
    supported(v)?;
    let (_, required_sets) = build_alphabet(policy)?;

    let mut last = None;
    for i in 0..DEFAULT_MAX_TRIES as u64 {
        let used_c = c + i;
        let password = derive_once(master, capsule, site_id, login, policy, v, used_c, rseed)?;
        if satisfies_classes(&password, &required_sets) {
            return Ok((password, used_c));
        }
        last = Some((password, used_c));
    }
    // Extremely unlikely; return the last candidate anyway per §4.7.
    warn!(
        site_id,
        tries = DEFAULT_MAX_TRIES,
        "policy not satisfied after max retries; returning last candidate"
    );
    Ok(last.expect("max_tries > 0"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Profile;

    fn strict_policy() -> Policy {
        Profile::Strict.into()
    }

    #[test]
    fn deterministic_across_calls() {
        let policy = strict_policy();
        let rseed = [0u8; 16];
        let a = derive_with_retries(
            b"correct horse battery staple",
            None,
            "example.com",
            "u@x",
            &policy,
            SUPPORTED_ALGO_VERSION,
            0,
            &rseed,
        )
        .unwrap();
        let b = derive_with_retries(
            b"correct horse battery staple",
            None,
            "example.com",
            "u@x",
            &policy,
            SUPPORTED_ALGO_VERSION,
            0,
            &rseed,
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn matches_policy_length_and_all_classes() {
        let policy = strict_policy();
        let rseed = [0u8; 16];
        let (password, _) = derive_with_retries(
            b"correct horse battery staple",
            None,
            "example.com",
            "u@x",
            &policy,
            SUPPORTED_ALGO_VERSION,
            0,
            &rseed,
        )
        .unwrap();
        assert_eq!(password.len(), 24);
        assert!(password.chars().any(|c| c.is_ascii_lowercase()));
        assert!(password.chars().any(|c| c.is_ascii_uppercase()));
        assert!(password.chars().any(|c| c.is_ascii_digit()));
        assert!(password.chars().any(|c| crate::policy::SYMBOLS.contains(c)));
        for forbidden in ['"', '\'', '`', ' '] {
            assert!(!password.contains(forbidden));
        }
    }

    #[test]
    fn counter_changes_password() {
        let policy = strict_policy();
        let rseed = [0u8; 16];
        let p0 = derive_once(
            b"master",
            None,
            "example.com",
            "u@x",
            &policy,
            SUPPORTED_ALGO_VERSION,
            0,
            &rseed,
        )
        .unwrap();
        let p1 = derive_once(
            b"master",
            None,
            "example.com",
            "u@x",
            &policy,
            SUPPORTED_ALGO_VERSION,
            1,
            &rseed,
        )
        .unwrap();
        let diff = p0
            .chars()
            .zip(p1.chars())
            .filter(|(a, b)| a != b)
            .count();
        assert!(diff >= 12, "expected high divergence, got {diff}");
    }

    #[test]
    fn capsule_changes_password() {
        let policy = strict_policy();
        let rseed = [0u8; 16];
        let p_a = derive_once(
            b"master",
            Some(&[1u8; 32]),
            "example.com",
            "u@x",
            &policy,
            SUPPORTED_ALGO_VERSION,
            0,
            &rseed,
        )
        .unwrap();
        let p_b = derive_once(
            b"master",
            Some(&[2u8; 32]),
            "example.com",
            "u@x",
            &policy,
            SUPPORTED_ALGO_VERSION,
            0,
            &rseed,
        )
        .unwrap();
        assert_ne!(p_a, p_b);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let policy = strict_policy();
        let rseed = [0u8; 16];
        let err = derive_with_retries(
            b"master", None, "example.com", "u@x", &policy, "md5-v0", 0, &rseed,
        )
        .unwrap_err();
        assert!(matches!(err, PwgenError::AlgoVersionUnsupported(_)));
    }
}
