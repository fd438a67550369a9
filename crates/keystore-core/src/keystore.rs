//! KeyStore facade over one or more backends

use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{KeyStoreError, Result};
use crate::item::KeyStoreItem;
use crate::settings::Settings;
use crate::storage::{Backend, DiskBackend, KeychainBackend};

/// Handle to a backend registered with a `KeyStore`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendId(usize);

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backend#{}", self.0)
    }
}

/// An item together with the backend it was listed from
#[derive(Debug, Clone)]
pub struct ListedItem {
    pub item: KeyStoreItem,
    pub backend: BackendId,
}

/// Aggregated listing across all backends
///
/// `error` holds the first backend failure; items from every backend that
/// could be listed are still present.
#[derive(Debug)]
pub struct KeyStoreListing {
    pub items: Vec<ListedItem>,
    pub error: Option<KeyStoreError>,
}

impl KeyStoreListing {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Items from the given backend
    pub fn from_backend(&self, backend: BackendId) -> impl Iterator<Item = &KeyStoreItem> {
        self.items
            .iter()
            .filter(move |listed| listed.backend == backend)
            .map(|listed| &listed.item)
    }
}

/// Keystore composed of multiple storage backends
pub struct KeyStore {
    backends: Vec<Box<dyn Backend>>,
    /// file name -> backend that last listed or stored it
    owners: HashMap<String, BackendId>,
}

impl KeyStore {
    pub fn new(backends: Vec<Box<dyn Backend>>) -> Self {
        Self {
            backends,
            owners: HashMap::new(),
        }
    }

    /// Build a keystore from settings: the disk backend always, the
    /// keychain backend when enabled
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let dir = match &settings.keystore_dir {
            Some(dir) => dir.clone(),
            None => DiskBackend::default_dir()?,
        };

        let disk: Box<dyn Backend> = Box::new(DiskBackend::new(dir)?);
        let mut keystore = Self::new(vec![disk]);

        if settings.keychain.enabled {
            let keychain = KeychainBackend::new(Some(&settings.keychain.service));
            keystore.add_backend(Box::new(keychain));
        }

        info!("Keystore opened with {} backend(s)", keystore.backends.len());
        Ok(keystore)
    }

    /// Register another backend
    pub fn add_backend(&mut self, backend: Box<dyn Backend>) -> BackendId {
        self.backends.push(backend);
        BackendId(self.backends.len() - 1)
    }

    pub fn backend_ids(&self) -> impl Iterator<Item = BackendId> {
        (0..self.backends.len()).map(BackendId)
    }

    pub fn backend(&self, id: BackendId) -> Option<&dyn Backend> {
        self.backends.get(id.0).map(|backend| backend.as_ref())
    }

    /// List items from every backend
    ///
    /// A failing backend does not stop the others from being queried, and
    /// whatever it did read is still returned.
    pub fn list(&mut self) -> KeyStoreListing {
        let mut items = Vec::new();
        let mut first_error = None;
        self.owners.clear();

        for (index, backend) in self.backends.iter().enumerate() {
            let id = BackendId(index);
            let listing = backend.list();

            for item in listing.items {
                self.owners.insert(item.file_name().to_string(), id);
                items.push(ListedItem { item, backend: id });
            }

            if let Some(e) = listing.error {
                warn!("Failed to list {} ({}): {}", backend.backend_name(), id, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        debug!("Listed {} items across {} backends", items.len(), self.backends.len());
        KeyStoreListing {
            items,
            error: first_error,
        }
    }

    /// Store an item in the given backend
    pub fn add(&mut self, item: &KeyStoreItem, backend: BackendId) -> Result<()> {
        self.resolve(backend)?.add(item)?;
        self.owners.insert(item.file_name().to_string(), backend);
        Ok(())
    }

    /// Remove an item from the given backend
    pub fn remove(&mut self, item: &KeyStoreItem, backend: BackendId) -> Result<()> {
        self.resolve(backend)?.remove(item)?;
        if self.owners.get(item.file_name()) == Some(&backend) {
            self.owners.remove(item.file_name());
        }
        Ok(())
    }

    /// Backend that produced or stored the item most recently
    pub fn owner_of(&self, item: &KeyStoreItem) -> Option<BackendId> {
        self.owners.get(item.file_name()).copied()
    }

    /// Remove an item from the backend it was listed from
    pub fn remove_listed(&mut self, item: &KeyStoreItem) -> Result<()> {
        let backend = self.owner_of(item).ok_or_else(|| {
            KeyStoreError::Validation(format!(
                "Item {} has not been listed from this keystore",
                item.id()
            ))
        })?;
        self.remove(item, backend)
    }

    fn resolve(&self, id: BackendId) -> Result<&dyn Backend> {
        self.backend(id)
            .ok_or_else(|| KeyStoreError::Validation(format!("Unknown {}", id)))
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.backends.iter().map(|b| b.backend_name()).collect();
        f.debug_struct("KeyStore")
            .field("backends", &names)
            .field("owners", &self.owners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ScryptCost;
    use crate::settings::{KeychainSettings, Settings};
    use crate::storage::BackendListing;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory backend
    #[derive(Default)]
    struct MemoryBackend {
        items: Mutex<Vec<KeyStoreItem>>,
    }

    impl MemoryBackend {
        fn with_items(count: usize) -> Self {
            let backend = Self::default();
            for _ in 0..count {
                backend.add(&test_item()).unwrap();
            }
            backend
        }
    }

    impl Backend for MemoryBackend {
        fn list(&self) -> BackendListing {
            BackendListing::complete(self.items.lock().unwrap().clone())
        }

        fn add(&self, item: &KeyStoreItem) -> Result<()> {
            let mut items = self.items.lock().unwrap();
            items.retain(|existing| existing.file_name() != item.file_name());
            items.push(item.clone());
            Ok(())
        }

        fn remove(&self, item: &KeyStoreItem) -> Result<()> {
            self.items
                .lock()
                .unwrap()
                .retain(|existing| existing.file_name() != item.file_name());
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "Memory"
        }
    }

    /// Returns `readable` items and then fails with `reason`
    struct FailingBackend {
        reason: &'static str,
        readable: Vec<KeyStoreItem>,
    }

    impl FailingBackend {
        fn new(reason: &'static str) -> Self {
            Self::partial(reason, 0)
        }

        fn partial(reason: &'static str, readable: usize) -> Self {
            Self {
                reason,
                readable: (0..readable).map(|_| test_item()).collect(),
            }
        }
    }

    impl Backend for FailingBackend {
        fn list(&self) -> BackendListing {
            BackendListing {
                items: self.readable.clone(),
                error: Some(KeyStoreError::Keychain(self.reason.to_string())),
            }
        }

        fn add(&self, _item: &KeyStoreItem) -> Result<()> {
            Err(KeyStoreError::Keychain(self.reason.to_string()))
        }

        fn remove(&self, _item: &KeyStoreItem) -> Result<()> {
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "Failing"
        }
    }

    fn boxed<B: Backend + 'static>(backend: B) -> Box<dyn Backend> {
        Box::new(backend)
    }

    fn test_item() -> KeyStoreItem {
        KeyStoreItem::builder()
            .secret(&[3u8; 32])
            .password("password")
            .cost(ScryptCost::new(16, 1))
            .build()
            .unwrap()
    }

    #[test]
    fn test_list_aggregates_backends() {
        let mut keystore = KeyStore::new(vec![
            boxed(MemoryBackend::with_items(2)),
            boxed(MemoryBackend::with_items(3)),
        ]);
        let ids: Vec<BackendId> = keystore.backend_ids().collect();

        let listing = keystore.list();

        assert!(listing.is_complete());
        assert_eq!(listing.items.len(), 5);
        assert_eq!(listing.from_backend(ids[0]).count(), 2);
        assert_eq!(listing.from_backend(ids[1]).count(), 3);
        for listed in &listing.items {
            assert_eq!(keystore.owner_of(&listed.item), Some(listed.backend));
        }
    }

    #[test]
    fn test_failing_backend_does_not_abort_listing() {
        let mut keystore = KeyStore::new(vec![
            boxed(MemoryBackend::with_items(1)),
            boxed(FailingBackend::new("locked")),
            boxed(MemoryBackend::with_items(2)),
            boxed(FailingBackend::new("unreachable")),
        ]);

        let listing = keystore.list();

        assert_eq!(listing.items.len(), 3);
        assert!(!listing.is_complete());
        match listing.error {
            Some(KeyStoreError::Keychain(reason)) => assert_eq!(reason, "locked"),
            other => panic!("expected the first backend error, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_listing_keeps_items() {
        let mut keystore = KeyStore::new(vec![
            boxed(MemoryBackend::with_items(1)),
            boxed(FailingBackend::partial("entry 3 unreadable", 2)),
        ]);
        let ids: Vec<BackendId> = keystore.backend_ids().collect();

        let listing = keystore.list();

        assert_eq!(listing.items.len(), 3);
        assert_eq!(listing.from_backend(ids[1]).count(), 2);
        assert!(matches!(
            &listing.error,
            Some(KeyStoreError::Keychain(reason)) if reason == "entry 3 unreadable"
        ));
        for listed in listing.from_backend(ids[1]) {
            assert_eq!(keystore.owner_of(listed), Some(ids[1]));
        }
    }

    #[test]
    fn test_add_and_remove_are_scoped() {
        let mut keystore = KeyStore::new(Vec::new());
        let first = keystore.add_backend(Box::new(MemoryBackend::default()));
        let second = keystore.add_backend(Box::new(MemoryBackend::default()));
        let item = test_item();

        keystore.add(&item, second).unwrap();
        assert_eq!(keystore.owner_of(&item), Some(second));

        let listing = keystore.list();
        assert_eq!(listing.from_backend(first).count(), 0);
        assert_eq!(listing.from_backend(second).count(), 1);

        // Removing from the wrong backend leaves the item in place
        keystore.remove(&item, first).unwrap();
        assert_eq!(keystore.list().items.len(), 1);

        keystore.remove(&item, second).unwrap();
        assert!(keystore.list().items.is_empty());
    }

    #[test]
    fn test_remove_listed_routes_to_owner() {
        let mut keystore = KeyStore::new(vec![
            boxed(MemoryBackend::with_items(1)),
            boxed(MemoryBackend::with_items(1)),
        ]);

        let listing = keystore.list();
        let target = listing.items[1].clone();

        keystore.remove_listed(&target.item).unwrap();

        let listing = keystore.list();
        assert_eq!(listing.items.len(), 1);
        assert_ne!(listing.items[0].item.id(), target.item.id());
        assert_eq!(keystore.owner_of(&target.item), None);
    }

    #[test]
    fn test_remove_listed_unknown_item() {
        let mut keystore = KeyStore::new(vec![boxed(MemoryBackend::default())]);
        let result = keystore.remove_listed(&test_item());
        assert!(matches!(result, Err(KeyStoreError::Validation(_))));
    }

    #[test]
    fn test_unknown_backend_id() {
        let mut keystore = KeyStore::new(vec![boxed(MemoryBackend::default())]);
        let result = keystore.add(&test_item(), BackendId(7));
        assert!(matches!(result, Err(KeyStoreError::Validation(_))));
    }

    #[test]
    fn test_from_settings_uses_disk() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings {
            keystore_dir: Some(temp_dir.path().join("keys")),
            keychain: KeychainSettings {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut keystore = KeyStore::from_settings(&settings).unwrap();
        let disk = keystore.backend_ids().next().unwrap();
        assert_eq!(keystore.backend(disk).unwrap().backend_name(), "Disk");

        let item = KeyStoreItem::builder()
            .secret(&[8u8; 32])
            .password("password")
            .cost(ScryptCost::new(16, 1))
            .build()
            .unwrap();
        keystore.add(&item, disk).unwrap();

        assert!(temp_dir.path().join("keys").join(item.file_name()).is_file());
        assert_eq!(keystore.list().items.len(), 1);
    }
}
