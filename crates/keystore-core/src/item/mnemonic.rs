//! Mnemonic extension: encrypted entropy from which a backup phrase is derived

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::{self, ScryptCost, SecretBytes, SecretStorageEnvelope};
use crate::error::{KeyStoreError, Result};

/// Minimum accepted entropy length in bytes
pub const MIN_ENTROPY_LEN: usize = 32;
/// Version of the mnemonic extension block
pub const MNEMONIC_FORMAT_VERSION: u32 = 1;

/// Mnemonic input supplied when constructing an item
pub struct MnemonicInfo {
    entropy: Zeroizing<Vec<u8>>,
    locale_tag: String,
    derivation_path: String,
}

impl MnemonicInfo {
    /// # Arguments
    /// * `entropy` - Raw entropy, at least `MIN_ENTROPY_LEN` bytes
    /// * `locale_tag` - Word list locale (e.g. "en")
    /// * `derivation_path` - HD derivation path (e.g. "m/44'/60'/0'/0/0")
    pub fn new(
        entropy: Vec<u8>,
        locale_tag: impl Into<String>,
        derivation_path: impl Into<String>,
    ) -> Self {
        Self {
            entropy: Zeroizing::new(entropy),
            locale_tag: locale_tag.into(),
            derivation_path: derivation_path.into(),
        }
    }

    pub fn entropy_len(&self) -> usize {
        self.entropy.len()
    }

    pub fn locale_tag(&self) -> &str {
        &self.locale_tag
    }

    pub fn derivation_path(&self) -> &str {
        &self.derivation_path
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.entropy.len() < MIN_ENTROPY_LEN {
            return Err(KeyStoreError::Validation(format!(
                "Mnemonic entropy too short: expected at least {} bytes, got {}",
                MIN_ENTROPY_LEN,
                self.entropy.len()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MnemonicInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MnemonicInfo")
            .field("entropy", &"[REDACTED]")
            .field("locale_tag", &self.locale_tag)
            .field("derivation_path", &self.derivation_path)
            .finish()
    }
}

/// Persisted mnemonic block, with its own independent envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mnemonic {
    #[serde(rename = "crypto")]
    pub envelope: SecretStorageEnvelope,
    #[serde(rename = "langLocale")]
    pub locale_tag: String,
    #[serde(rename = "path")]
    pub derivation_path: String,
    pub version: u32,
}

impl Mnemonic {
    /// Encrypt the entropy with its own salt and IV
    pub fn encrypt(info: &MnemonicInfo, password: &str, cost: ScryptCost) -> Result<Self> {
        info.validate()?;
        Ok(Self {
            envelope: crypto::encrypt(&info.entropy, password, cost)?,
            locale_tag: info.locale_tag.clone(),
            derivation_path: info.derivation_path.clone(),
            version: MNEMONIC_FORMAT_VERSION,
        })
    }

    pub fn decrypt_entropy(&self, password: &str) -> Result<SecretBytes> {
        crypto::decrypt(&self.envelope, password)
    }
}
