//! Keystore settings management
//!
//! Stores non-sensitive configuration in a plain JSON file: where the disk
//! keystore lives, the scrypt cost for new items, and keychain use.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::crypto::{ScryptCost, SCRYPT_N, SCRYPT_P};
use crate::error::{KeyStoreError, Result};
use crate::storage::DEFAULT_KEYCHAIN_SERVICE;

/// Current settings file version
pub const SETTINGS_VERSION: u32 = 1;

/// scrypt cost applied to newly created items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KdfSettings {
    /// Cost factor N (power of two)
    pub n: u64,
    /// Parallelism p
    pub p: u32,
}

impl Default for KdfSettings {
    fn default() -> Self {
        Self {
            n: SCRYPT_N,
            p: SCRYPT_P,
        }
    }
}

impl KdfSettings {
    pub fn cost(&self) -> ScryptCost {
        ScryptCost::new(self.n, self.p)
    }
}

/// System keychain configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeychainSettings {
    /// Whether to add the keychain backend
    pub enabled: bool,
    /// Service name for keychain entries
    pub service: String,
}

impl Default for KeychainSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
        }
    }
}

/// Keystore settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Settings file version
    pub version: u32,
    /// Disk keystore directory (`~/` allowed); per-user data dir when unset
    pub keystore_dir: Option<PathBuf>,
    /// scrypt cost for new items
    pub kdf: KdfSettings,
    /// Keychain backend configuration
    pub keychain: KeychainSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            keystore_dir: None,
            kdf: KdfSettings::default(),
            keychain: KeychainSettings::default(),
        }
    }
}

/// Settings manager
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Load `settings.json` from `config_dir`, falling back to defaults
    pub fn new(config_dir: &Path) -> Self {
        let settings_file = config_dir.join("settings.json");
        let settings = Self::load_from_file(&settings_file).unwrap_or_else(|e| {
            warn!("Ignoring unreadable settings file {:?}: {}", settings_file, e);
            Settings::default()
        });

        Self {
            settings_file,
            settings,
        }
    }

    /// Settings manager in the per-user config directory
    pub fn default_location() -> Result<Self> {
        ProjectDirs::from("com", "symbia-labs", "web3-keystore")
            .map(|dirs| Self::new(dirs.config_dir()))
            .ok_or_else(|| {
                KeyStoreError::Configuration("Could not determine config directory".to_string())
            })
    }

    /// Load settings from file
    fn load_from_file(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!("No settings file found, using defaults");
            return Ok(Settings::default());
        }

        let contents = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.settings_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.settings)?;

        // Write atomically using temp file
        let temp_path = self.settings_file.with_extension("tmp");
        fs::write(&temp_path, &contents)?;
        fs::rename(&temp_path, &self.settings_file)?;

        debug!("Saved settings to {:?}", self.settings_file);
        Ok(())
    }

    /// Get current settings
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Get mutable settings
    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
