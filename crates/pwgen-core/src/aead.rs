//! AEAD envelope: ChaCha20-Poly1305 with fixed associated data (§4.8).

use crate::error::PwgenError;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::{rngs::OsRng, RngCore};
use tracing::warn;

pub const NONCE_LEN: usize = 12;
pub const VAULT_AAD: &[u8] = b"pwgen|vault|v1";

pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext`, producing ciphertext-with-tag (RFC 8439).
pub fn encrypt(key: &[u8], nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> anyhow::Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            chacha20poly1305::aead::Payload {
                msg: plaintext,
                aad: VAULT_AAD,
            },
        )
        .map_err(|e| anyhow::anyhow!("aead encrypt: {e}"))
}

/// Decrypt and verify the tag. Any failure yields a single opaque
/// `AuthFailure` — it must never distinguish a wrong master from tampering.
pub fn decrypt(key: &[u8], nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, PwgenError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            chacha20poly1305::aead::Payload {
                msg: ciphertext,
                aad: VAULT_AAD,
            },
        )
        .map_err(|_| {
            warn!("aead decrypt failed (wrong master or tampered vault)");
            PwgenError::AuthFailure
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let key = [1u8; 32];
        let nonce = generate_nonce();
        let pt = b"hello vault";
        let ct = encrypt(&key, &nonce, pt).unwrap();
        let back = decrypt(&key, &nonce, &ct).unwrap();
        assert_eq!(back, pt);
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let key = [1u8; 32];
        let nonce = generate_nonce();
        let mut ct = encrypt(&key, &nonce, b"data").unwrap();
        ct[0] ^= 0xFF;
        assert!(matches!(decrypt(&key, &nonce, &ct), Err(PwgenError::AuthFailure)));
    }

    #[test]
    fn tampered_nonce_fails_auth() {
        let key = [1u8; 32];
        let nonce = generate_nonce();
        let ct = encrypt(&key, &nonce, b"data").unwrap();
        let mut bad_nonce = nonce;
        bad_nonce[0] ^= 0xFF;
        assert!(matches!(decrypt(&key, &bad_nonce, &ct), Err(PwgenError::AuthFailure)));
    }
}
