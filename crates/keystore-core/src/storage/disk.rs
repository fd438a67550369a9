//! Disk storage backend
//!
//! Stores each item as a JSON file named after `KeyStoreItem::file_name`
//! directly under a root directory. Files are readable by the owner only.

use directories::{BaseDirs, ProjectDirs};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use super::{Backend, BackendListing};
use crate::error::{KeyStoreError, Result};
use crate::item::KeyStoreItem;

/// Disk storage backend
#[derive(Debug, Clone)]
pub struct DiskBackend {
    /// Absolute, normalized storage root
    root: PathBuf,
}

impl DiskBackend {
    /// Create a disk backend rooted at `path`
    ///
    /// A leading `~` is expanded to the home directory, the path is made
    /// absolute and normalized, and the directory tree is created if missing.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let root = resolve_root(path.as_ref())?;
        create_root(&root).map_err(|e| {
            KeyStoreError::Configuration(format!(
                "Could not create keystore directory {:?}: {}",
                root, e
            ))
        })?;
        if !root.is_dir() {
            return Err(KeyStoreError::Configuration(format!(
                "Keystore path {:?} is not a directory",
                root
            )));
        }

        debug!("Disk keystore initialized at: {:?}", root);
        Ok(Self { root })
    }

    /// Create a disk backend in the per-user data directory
    pub fn default_location() -> Result<Self> {
        Self::new(Self::default_dir()?)
    }

    /// Get the default keystore directory
    pub fn default_dir() -> Result<PathBuf> {
        ProjectDirs::from("com", "symbia-labs", "web3-keystore")
            .map(|dirs| dirs.data_dir().join("keystore"))
            .ok_or_else(|| {
                KeyStoreError::Configuration("Could not determine data directory".to_string())
            })
    }

    /// Get the storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn item_path(&self, item: &KeyStoreItem) -> PathBuf {
        self.root.join(item.file_name())
    }

    fn read_item(path: &Path) -> Result<KeyStoreItem> {
        let contents = fs::read_to_string(path)?;
        KeyStoreItem::from_json(&contents)
    }
}

impl Backend for DiskBackend {
    fn list(&self) -> BackendListing {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read keystore directory {:?}: {}", self.root, e);
                return BackendListing::failed(e.into());
            }
        };

        let mut listing = BackendListing::default();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read keystore directory entry: {}", e);
                    listing.record_error(e.into());
                    continue;
                }
            };

            let path = entry.path();
            if path.is_dir() || is_hidden(&path) {
                continue;
            }

            match Self::read_item(&path) {
                Ok(item) => listing.items.push(item),
                Err(e) => warn!("Skipping unreadable keystore file {:?}: {}", path, e),
            }
        }

        debug!("Listed {} items from {:?}", listing.items.len(), self.root);
        listing
    }

    fn add(&self, item: &KeyStoreItem) -> Result<()> {
        let contents = item.to_json()?;
        let path = self.item_path(item);

        // Write atomically using a temp file
        let temp_path = self.root.join(format!(".{}.tmp", item.file_name()));
        if let Err(e) = write_private(&temp_path, contents.as_bytes())
            .and_then(|_| fs::rename(&temp_path, &path))
        {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        debug!("Stored item {} at {:?}", item.id(), path);
        Ok(())
    }

    fn remove(&self, item: &KeyStoreItem) -> Result<()> {
        let path = self.item_path(item);

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed item {} from {:?}", item.id(), path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "Disk"
    }
}

fn resolve_root(path: &Path) -> Result<PathBuf> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(rest))
            .ok_or_else(|| {
                KeyStoreError::Configuration("Could not determine home directory".to_string())
            })?,
        Err(_) => path.to_path_buf(),
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map_err(|e| {
                KeyStoreError::Configuration(format!("Could not resolve {:?}: {}", path, e))
            })?
            .join(expanded)
    };

    Ok(normalize(&absolute))
}

/// Lexically remove `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn create_root(root: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o700).create(root)
    }

    #[cfg(not(unix))]
    {
        fs::create_dir_all(root)
    }
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    // mode() only applies when the file is created
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(contents)?;
    file.sync_all()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
