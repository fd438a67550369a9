//! OS Keychain storage backend
//!
//! Uses the system keychain for storage:
//! - macOS: Keychain
//! - Windows: Credential Manager (DPAPI)
//! - Linux: Secret Service (GNOME Keyring, KWallet)
//!
//! Each item's JSON is stored under its file name. Keychains cannot
//! enumerate entries, so an index entry holds the list of stored names.

use keyring::Entry;
use tracing::{debug, warn};

use super::{Backend, BackendListing};
use crate::error::{KeyStoreError, Result};
use crate::item::KeyStoreItem;

/// Default service name used for keychain entries
pub const DEFAULT_SERVICE: &str = "web3-keystore";

/// Entry holding the JSON array of stored file names
const INDEX_ENTRY: &str = "__index__";

/// OS Keychain storage backend
#[derive(Debug, Clone)]
pub struct KeychainBackend {
    service: String,
}

impl KeychainBackend {
    /// Create a keychain backend under the given service name
    pub fn new(service: Option<&str>) -> Self {
        Self {
            service: service.unwrap_or(DEFAULT_SERVICE).to_string(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, name: &str) -> Result<Entry> {
        Entry::new(&self.service, name).map_err(|e| KeyStoreError::Keychain(e.to_string()))
    }

    fn read_index(&self) -> Result<Vec<String>> {
        match self.entry(INDEX_ENTRY)?.get_password() {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(keyring::Error::NoEntry) => Ok(Vec::new()),
            Err(e) => Err(KeyStoreError::Keychain(e.to_string())),
        }
    }

    fn write_index(&self, names: &[String]) -> Result<()> {
        let json = serde_json::to_string(names)?;
        self.entry(INDEX_ENTRY)?
            .set_password(&json)
            .map_err(|e| KeyStoreError::Keychain(e.to_string()))
    }

    fn read_item(&self, name: &str) -> Result<Option<KeyStoreItem>> {
        match self.entry(name)?.get_password() {
            Ok(json) => Ok(Some(KeyStoreItem::from_json(&json)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(KeyStoreError::Keychain(e.to_string())),
        }
    }
}

impl Default for KeychainBackend {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Backend for KeychainBackend {
    fn list(&self) -> BackendListing {
        let index = match self.read_index() {
            Ok(index) => index,
            Err(e) => {
                warn!("Failed to read keychain index: {}", e);
                return BackendListing::failed(e);
            }
        };

        let mut listing = BackendListing::default();
        for name in index {
            match self.read_item(&name) {
                Ok(Some(item)) => listing.items.push(item),
                Ok(None) => warn!("Keychain index lists missing entry {}", name),
                Err(e @ KeyStoreError::Keychain(_)) => {
                    warn!("Failed to read keychain entry {}: {}", name, e);
                    listing.record_error(e);
                }
                Err(e) => warn!("Skipping unreadable keychain entry {}: {}", name, e),
            }
        }

        debug!("Listed {} items from keychain", listing.items.len());
        listing
    }

    fn add(&self, item: &KeyStoreItem) -> Result<()> {
        let json = item.to_json()?;
        self.entry(item.file_name())?
            .set_password(&json)
            .map_err(|e| KeyStoreError::Keychain(e.to_string()))?;

        let mut index = self.read_index()?;
        if index_insert(&mut index, item.file_name()) {
            self.write_index(&index)?;
        }

        debug!("Stored item {} in keychain", item.id());
        Ok(())
    }

    fn remove(&self, item: &KeyStoreItem) -> Result<()> {
        match self.entry(item.file_name())?.delete_password() {
            Ok(()) => debug!("Deleted item {} from keychain", item.id()),
            Err(keyring::Error::NoEntry) => {}
            Err(e) => return Err(KeyStoreError::Keychain(e.to_string())),
        }

        let mut index = self.read_index()?;
        if index_remove(&mut index, item.file_name()) {
            self.write_index(&index)?;
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        #[cfg(target_os = "macos")]
        return "macOS Keychain";

        #[cfg(target_os = "windows")]
        return "Windows Credential Manager";

        #[cfg(target_os = "linux")]
        return "Linux Secret Service";

        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        return "System Keychain";
    }
}

/// Returns true if the index changed
fn index_insert(index: &mut Vec<String>, name: &str) -> bool {
    if index.iter().any(|existing| existing == name) {
        return false;
    }
    index.push(name.to_string());
    true
}

/// Returns true if the index changed
fn index_remove(index: &mut Vec<String>, name: &str) -> bool {
    let before = index.len();
    index.retain(|existing| existing != name);
    index.len() != before
}
