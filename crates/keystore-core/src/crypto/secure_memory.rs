//! Secure memory handling with automatic zeroization

use zeroize::{Zeroize, ZeroizeOnDrop};

/// scrypt output split into an encryption half and a MAC half.
/// Zeroed when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; 32],
}

impl DerivedKey {
    /// Create a derived key from raw bytes
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// AES-128 key: the first 16 bytes
    pub fn encryption_key(&self) -> &[u8] {
        &self.key[..16]
    }

    /// MAC key: the last 16 bytes
    pub fn mac_key(&self) -> &[u8] {
        &self.key[16..]
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Decrypted secret bytes - automatically zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes {
    value: Vec<u8>,
}

impl SecretBytes {
    pub fn new(value: Vec<u8>) -> Self {
        Self { value }
    }

    /// Get the secret bytes (use carefully - avoid copying)
    pub fn expose(&self) -> &[u8] {
        &self.value
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBytes")
            .field("len", &self.value.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}
