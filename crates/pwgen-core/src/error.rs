//! Error taxonomy surfaced by the public API (§7).

#[derive(Debug, thiserror::Error)]
pub enum PwgenError {
    #[error("vault not found")]
    VaultMissing,

    #[error("vault format invalid: {0}")]
    VaultFormat(String),

    #[error("authentication failed")]
    AuthFailure,

    #[error("record not found for site")]
    RecordMissing,

    #[error("record already exists for site")]
    RecordExists,

    #[error("policy invalid: {0}")]
    PolicyInvalid(String),

    #[error("unsupported algorithm version: {0}")]
    AlgoVersionUnsupported(String),

    #[error("vault I/O failed: {0}")]
    IOFailure(String),
}

impl From<std::io::Error> for PwgenError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            PwgenError::VaultMissing
        } else {
            PwgenError::IOFailure(e.to_string())
        }
    }
}

impl From<serde_json::Error> for PwgenError {
    fn from(e: serde_json::Error) -> Self {
        PwgenError::VaultFormat(e.to_string())
    }
}
