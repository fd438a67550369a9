//! Cryptographic primitives for the secret storage envelope
//!
//! This module provides:
//! - scrypt key derivation with caller-tunable cost
//! - AES-128-CTR encryption authenticated by a keccak-256 MAC
//! - Zeroizing containers for derived keys and decrypted secrets

mod envelope;
mod kdf;
mod secure_memory;

pub use envelope::{
    decrypt, encrypt, CipherParams, ScryptParams, SecretStorageEnvelope, CIPHER_AES_128_CTR,
    IV_LEN, KDF_SCRYPT,
};
pub use kdf::{
    derive_key, generate_salt, ScryptCost, MAX_SCRYPT_N, MAX_SCRYPT_P, SALT_LEN, SCRYPT_DKLEN,
    SCRYPT_N, SCRYPT_P, SCRYPT_R,
};
pub use secure_memory::{DerivedKey, SecretBytes};
