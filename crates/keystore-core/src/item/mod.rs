//! Keystore items: the persisted unit of secret storage

mod file_name;
mod keystore_item;
mod mnemonic;

pub use file_name::{file_name, timestamp};
pub use keystore_item::{padded_scalar, KeyStoreItem, KeyStoreItemBuilder, FORMAT_VERSION, SCALAR_LEN};
pub use mnemonic::{Mnemonic, MnemonicInfo, MIN_ENTROPY_LEN, MNEMONIC_FORMAT_VERSION};
