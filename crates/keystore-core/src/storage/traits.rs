//! Storage trait definitions

use crate::error::{KeyStoreError, Result};
use crate::item::KeyStoreItem;

/// Items a backend managed to read, plus the failure that cut the
/// enumeration short, if any
#[derive(Debug, Default)]
pub struct BackendListing {
    pub items: Vec<KeyStoreItem>,
    pub error: Option<KeyStoreError>,
}

impl BackendListing {
    pub fn complete(items: Vec<KeyStoreItem>) -> Self {
        Self { items, error: None }
    }

    /// Nothing could be enumerated
    pub fn failed(error: KeyStoreError) -> Self {
        Self {
            items: Vec::new(),
            error: Some(error),
        }
    }

    /// Keep the first error seen during enumeration
    pub fn record_error(&mut self, error: KeyStoreError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

/// Trait for keystore storage backends
///
/// All operations block the caller.
pub trait Backend: Send + Sync {
    /// List every item the backend can parse.
    /// Corrupt entries are skipped with a warning. Access failures are
    /// reported in `BackendListing::error` next to whatever was read.
    fn list(&self) -> BackendListing;

    /// Store an item, replacing any entry with the same file name
    fn add(&self, item: &KeyStoreItem) -> Result<()>;

    /// Remove an item if present; removing an absent item is not an error
    fn remove(&self, item: &KeyStoreItem) -> Result<()>;

    /// Get a human-readable name for this storage backend
    fn backend_name(&self) -> &'static str;
}
