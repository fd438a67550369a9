//! # keystore-core
//!
//! Password-protected storage for private keys following the Web3 Secret
//! Storage (v3) format, extended to optionally carry encrypted mnemonic
//! entropy:
//! - scrypt key derivation with AES-128-CTR and a keccak-256 MAC
//! - `KeyStoreItem` aggregate with a deterministic storage file name
//! - Pluggable `Backend`s (disk, system keychain) composed by `KeyStore`

pub mod crypto;
pub mod error;
pub mod item;
pub mod settings;
pub mod storage;
mod keystore;

pub use crypto::{decrypt, encrypt, DerivedKey, ScryptCost, SecretBytes, SecretStorageEnvelope};
pub use error::{KeyStoreError, Result};
pub use item::{KeyStoreItem, KeyStoreItemBuilder, Mnemonic, MnemonicInfo};
pub use keystore::{BackendId, KeyStore, KeyStoreListing, ListedItem};
pub use settings::{KdfSettings, KeychainSettings, Settings, SettingsManager};
pub use storage::{Backend, BackendListing, DiskBackend, KeychainBackend};
