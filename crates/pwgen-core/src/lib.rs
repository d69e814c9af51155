//! Deterministic per-site password derivation engine with an authenticated
//! local vault. See `derive` for the derivation pipeline and `vault` for the
//! encrypted storage envelope.

pub mod aead;
pub mod capsule;
pub mod derive;
pub mod drbg;
pub mod error;
pub mod kdf;
pub mod key_schedule;
pub mod paths;
pub mod policy;
pub mod primitives;
pub mod sampler;
pub mod site_id;
pub mod vault;

pub use error::PwgenError;
