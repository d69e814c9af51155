//! HKDF-Extract/Expand over SHA-512 with domain-separated labels (§4.4).
//!
//! This is a deliberately simplified HKDF: `Expand` only ever produces a
//! single block (`L <= 64`), and `Extract` is truncated to 32 bytes rather
//! than the full SHA-512 digest size. Both must be reproduced bit-exactly —
//! do not substitute the generic `hkdf` crate's multi-block expansion.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::Zeroizing;

type HmacSha512 = Hmac<Sha512>;

pub const PRK_LEN: usize = 32;

/// `HKDF-Extract(salt, ikm) := HMAC-SHA-512(salt, ikm)[:32]`.
pub fn hkdf_extract(salt: &[u8], ikm: &[u8]) -> Zeroizing<[u8; PRK_LEN]> {
    let mut mac = HmacSha512::new_from_slice(salt).expect("HMAC accepts any key length");
    mac.update(ikm);
    let full = mac.finalize().into_bytes();
    let mut out = [0u8; PRK_LEN];
    out.copy_from_slice(&full[..PRK_LEN]);
    Zeroizing::new(out)
}

/// `HKDF-Expand(prk, info, L) := HMAC-SHA-512(prk, info || 0x01)[:L]`, `L <= 64`.
pub fn hkdf_expand(prk: &[u8], info: &[u8], len: usize) -> Zeroizing<Vec<u8>> {
    assert!(len <= 64, "single-block HKDF-Expand supports L <= 64");
    let mut mac = HmacSha512::new_from_slice(prk).expect("HMAC accepts any key length");
    mac.update(info);
    mac.update(&[0x01]);
    let full = mac.finalize().into_bytes();
    Zeroizing::new(full[..len].to_vec())
}

/// Build the canonical derivation context byte string (§4.4 step 1).
pub fn build_context(
    v: &str,
    site_id: &str,
    login: &str,
    policy_json: &str,
    c: u64,
    rseed: &[u8],
) -> Vec<u8> {
    format!(
        "pwgen|{v}|{site_id}|{login}|{policy_json}|c={c}|r={}",
        hex::encode(rseed)
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_is_deterministic() {
        let a = hkdf_extract(b"salt", b"ikm");
        let b = hkdf_extract(b"salt", b"ikm");
        assert_eq!(*a, *b);
    }

    #[test]
    fn expand_respects_length() {
        let prk = hkdf_extract(b"salt", b"ikm");
        let out = hkdf_expand(&*prk, b"info", 32);
        assert_eq!(out.len(), 32);
    }

    #[test]
    fn context_matches_expected_shape() {
        let ctx = build_context("sha512-v1", "example.com", "u@x", "{}", 0, &[0u8; 16]);
        let s = String::from_utf8(ctx).unwrap();
        assert_eq!(
            s,
            "pwgen|sha512-v1|example.com|u@x|{}|c=0|r=00000000000000000000000000000000"
        );
    }
}
