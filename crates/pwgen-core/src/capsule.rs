//! One-time per-vault entropy capsule (§4.10).

use crate::key_schedule::hkdf_extract;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub const CAPSULE_LEN: usize = 32;
pub type Capsule = [u8; CAPSULE_LEN];

/// `capsule := HKDF-Extract(salt=b"capsule|sha512-v1", ikm = osrng(64) ||
/// be64(time_ns()) || be32(pid) || [SHA-256(beacon) if provided])`, truncated
/// to 32 bytes (§4.10).
pub fn make_capsule(beacon: Option<&str>) -> Capsule {
    let mut ikm = Vec::with_capacity(64 + 8 + 4 + 32);
    let mut osrand = [0u8; 64];
    OsRng.fill_bytes(&mut osrand);
    ikm.extend_from_slice(&osrand);

    let time_ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_nanos() as u64;
    ikm.extend_from_slice(&time_ns.to_be_bytes());

    let pid = std::process::id();
    ikm.extend_from_slice(&pid.to_be_bytes());

    if let Some(b) = beacon {
        if !b.is_empty() {
            ikm.extend_from_slice(&Sha256::digest(b.as_bytes()));
        }
    }

    *hkdf_extract(b"capsule|sha512-v1", &ikm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capsules_are_32_bytes_and_vary() {
        let a = make_capsule(None);
        let b = make_capsule(None);
        assert_eq!(a.len(), CAPSULE_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn beacon_influences_capsule() {
        // Capsules still vary run to run (OS entropy + timestamp), but the
        // beacon bytes are mixed into the same IKM buffer as everything else.
        let with_beacon = make_capsule(Some("beacon"));
        let without = make_capsule(None);
        assert_ne!(with_beacon, without);
    }
}
