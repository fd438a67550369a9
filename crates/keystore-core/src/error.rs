//! Error types for keystore-core

use thiserror::Error;

/// Result type alias for keystore operations
pub type Result<T> = std::result::Result<T, KeyStoreError>;

/// Keystore error types
#[derive(Error, Debug)]
pub enum KeyStoreError {
    /// Storage root could not be resolved or created
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller supplied invalid input at item construction
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unsupported or malformed cipher/KDF parameters
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// MAC mismatch: wrong password or tampered envelope
    #[error("Integrity check failed - wrong password or corrupted data")]
    Integrity,

    #[error("Keychain error: {0}")]
    Keychain(String),
}

impl KeyStoreError {
    /// True when decryption failed because the MAC did not verify
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::Integrity)
    }
}
