//! KeyStoreItem: one encrypted private key, optionally with mnemonic entropy

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::file_name::file_name;
use super::mnemonic::{Mnemonic, MnemonicInfo};
use crate::crypto::{self, ScryptCost, SecretBytes, SecretStorageEnvelope};
use crate::error::{KeyStoreError, Result};

/// Web3 Secret Storage format version
pub const FORMAT_VERSION: u32 = 3;
/// Fixed width of an encoded private-key scalar
pub const SCALAR_LEN: usize = 32;

/// Encrypted private key as persisted by a backend
///
/// Items are immutable: the storage file name is derived once from the
/// creation instant and the id, and travels with the item from then on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStoreItem {
    #[serde(rename = "address", default)]
    label: String,
    #[serde(rename = "crypto")]
    envelope: SecretStorageEnvelope,
    id: String,
    version: u32,
    #[serde(
        rename = "x-soc-mnemonic-entropy-crypto",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    mnemonic: Option<Mnemonic>,
    #[serde(rename = "x-sos-fileName")]
    file_name: String,
}

impl KeyStoreItem {
    pub fn builder() -> KeyStoreItemBuilder {
        KeyStoreItemBuilder::default()
    }

    /// Encrypt a private key (and optional mnemonic entropy) into a new item
    ///
    /// # Arguments
    /// * `id` - Item id; a random v4 UUID when `None`
    /// * `scalar` - Big-endian private-key scalar, left-padded to 32 bytes
    /// * `label` - Human-readable label such as the derived address
    /// * `mnemonic` - Optional entropy, encrypted under the same password
    /// * `password` - Password for both envelopes
    /// * `cost` - scrypt cost for both envelopes
    pub fn new(
        id: Option<String>,
        scalar: &[u8],
        label: Option<String>,
        mnemonic: Option<&MnemonicInfo>,
        password: &str,
        cost: ScryptCost,
    ) -> Result<Self> {
        let id = match id {
            Some(id) => {
                validate_id(&id)?;
                id
            }
            None => Uuid::new_v4().to_string(),
        };
        if let Some(info) = mnemonic {
            info.validate()?;
        }

        let file_name = file_name(&Utc::now(), &id);
        let secret = padded_scalar(scalar);
        let envelope = crypto::encrypt(&secret, password, cost)?;
        let mnemonic = mnemonic
            .map(|info| Mnemonic::encrypt(info, password, cost))
            .transpose()?;

        debug!("Created keystore item {} ({})", id, file_name);

        Ok(Self {
            label: label.unwrap_or_default(),
            envelope,
            id,
            version: FORMAT_VERSION,
            mnemonic,
            file_name,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn envelope(&self) -> &SecretStorageEnvelope {
        &self.envelope
    }

    pub fn mnemonic(&self) -> Option<&Mnemonic> {
        self.mnemonic.as_ref()
    }

    pub fn has_mnemonic(&self) -> bool {
        self.mnemonic.is_some()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Decrypt the 32-byte private-key scalar
    pub fn decrypt_secret(&self, password: &str) -> Result<SecretBytes> {
        crypto::decrypt(&self.envelope, password)
    }

    /// Decrypt the mnemonic entropy, if this item carries any
    pub fn decrypt_mnemonic_entropy(&self, password: &str) -> Result<Option<SecretBytes>> {
        self.mnemonic
            .as_ref()
            .map(|mnemonic| mnemonic.decrypt_entropy(password))
            .transpose()
    }

    /// Canonical JSON form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let item: Self = serde_json::from_str(json)?;
        validate_id(&item.id)?;
        validate_file_name(&item.file_name)?;
        Ok(item)
    }
}

/// Builder for `KeyStoreItem`
#[derive(Default)]
pub struct KeyStoreItemBuilder {
    id: Option<String>,
    scalar: Option<Zeroizing<Vec<u8>>>,
    label: Option<String>,
    mnemonic: Option<MnemonicInfo>,
    password: Option<Zeroizing<String>>,
    cost: ScryptCost,
}

impl KeyStoreItemBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn secret(mut self, scalar: &[u8]) -> Self {
        self.scalar = Some(Zeroizing::new(scalar.to_vec()));
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn mnemonic(mut self, mnemonic: MnemonicInfo) -> Self {
        self.mnemonic = Some(mnemonic);
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    pub fn cost(mut self, cost: ScryptCost) -> Self {
        self.cost = cost;
        self
    }

    pub fn build(self) -> Result<KeyStoreItem> {
        let scalar = self
            .scalar
            .ok_or_else(|| KeyStoreError::Validation("Missing private key".to_string()))?;
        let password = self
            .password
            .ok_or_else(|| KeyStoreError::Validation("Missing password".to_string()))?;

        KeyStoreItem::new(
            self.id,
            &scalar,
            self.label,
            self.mnemonic.as_ref(),
            &password,
            self.cost,
        )
    }
}

/// Encode a big-endian scalar at fixed width, left-padding with zeros.
/// Scalars that need 32 or more significant bytes are kept as-is.
pub fn padded_scalar(scalar: &[u8]) -> Zeroizing<Vec<u8>> {
    let first_significant = scalar.iter().position(|b| *b != 0).unwrap_or(scalar.len());
    let significant = &scalar[first_significant..];
    if significant.len() >= SCALAR_LEN {
        return Zeroizing::new(significant.to_vec());
    }

    let mut padded = Zeroizing::new(vec![0u8; SCALAR_LEN]);
    padded[SCALAR_LEN - significant.len()..].copy_from_slice(significant);
    padded
}

// The id ends up in a file name
fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
        return Err(KeyStoreError::Validation(format!("Invalid item id: {:?}", id)));
    }
    Ok(())
}

fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(KeyStoreError::Validation(format!(
            "Invalid item file name: {:?}",
            name
        )));
    }
    Ok(())
}
