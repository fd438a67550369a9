//! Web3 Secret Storage envelope
//!
//! Encryption scheme:
//! - Key: scrypt(password, salt, N, r=8, p, dklen=32)
//! - Cipher: AES-128-CTR keyed with the first 16 bytes of the derived key
//! - MAC: keccak-256(derived_key[16..32] || ciphertext)
//!
//! All binary fields are persisted as lowercase hex.

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use subtle::ConstantTimeEq;
use tracing::debug;

use super::kdf::{derive_key, generate_salt, ScryptCost, SCRYPT_DKLEN, SCRYPT_R};
use super::SecretBytes;
use crate::error::{KeyStoreError, Result};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Cipher identifier persisted in `cipher`
pub const CIPHER_AES_128_CTR: &str = "aes-128-ctr";
/// KDF identifier persisted in `kdf`
pub const KDF_SCRYPT: &str = "scrypt";
/// IV width: one AES block
pub const IV_LEN: usize = 16;

/// Encrypted secret plus everything needed to decrypt it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretStorageEnvelope {
    #[serde(rename = "cipher")]
    pub cipher_name: String,
    #[serde(rename = "ciphertext")]
    pub cipher_text: String,
    #[serde(rename = "cipherparams")]
    pub cipher_params: CipherParams,
    #[serde(rename = "kdf")]
    pub kdf_name: String,
    #[serde(rename = "kdfparams")]
    pub kdf_params: ScryptParams,
    pub mac: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherParams {
    pub iv: String,
}

/// scrypt parameters, persisted verbatim so the key can be re-derived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScryptParams {
    pub n: u64,
    pub r: u32,
    pub p: u32,
    pub dklen: usize,
    pub salt: String,
}

impl SecretStorageEnvelope {
    pub fn iv(&self) -> &str {
        &self.cipher_params.iv
    }
}

/// Encrypt plaintext under a password
///
/// # Arguments
/// * `plaintext` - The secret to protect (may be empty)
/// * `password` - The user's password
/// * `cost` - scrypt N and p
///
/// # Returns
/// An envelope with a fresh random salt and IV
pub fn encrypt(plaintext: &[u8], password: &str, cost: ScryptCost) -> Result<SecretStorageEnvelope> {
    let salt = generate_salt();
    let key = derive_key(
        password.as_bytes(),
        &salt,
        cost.n,
        SCRYPT_R,
        cost.p,
        SCRYPT_DKLEN,
    )?;

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let cipher_text = aes_ctr_xor(key.encryption_key(), &iv, plaintext)?;
    let mac = keccak_mac(key.mac_key(), &cipher_text);

    debug!(
        "Encrypted {} bytes (scrypt n={}, p={})",
        plaintext.len(),
        cost.n,
        cost.p
    );

    Ok(SecretStorageEnvelope {
        cipher_name: CIPHER_AES_128_CTR.to_string(),
        cipher_text: hex::encode(&cipher_text),
        cipher_params: CipherParams {
            iv: hex::encode(iv),
        },
        kdf_name: KDF_SCRYPT.to_string(),
        kdf_params: ScryptParams {
            n: cost.n,
            r: SCRYPT_R,
            p: cost.p,
            dklen: SCRYPT_DKLEN,
            salt: hex::encode(salt),
        },
        mac: hex::encode(mac),
    })
}

/// Decrypt an envelope with a password
///
/// The key is re-derived from the envelope's own KDF parameters. A MAC
/// mismatch yields `KeyStoreError::Integrity` and no plaintext.
pub fn decrypt(envelope: &SecretStorageEnvelope, password: &str) -> Result<SecretBytes> {
    if envelope.kdf_name != KDF_SCRYPT {
        return Err(KeyStoreError::Crypto(format!(
            "Unsupported KDF: {}",
            envelope.kdf_name
        )));
    }
    if envelope.cipher_name != CIPHER_AES_128_CTR {
        return Err(KeyStoreError::Crypto(format!(
            "Unsupported cipher: {}",
            envelope.cipher_name
        )));
    }

    let params = &envelope.kdf_params;
    let salt = decode_hex("salt", &params.salt)?;
    let iv = decode_hex("iv", envelope.iv())?;
    let cipher_text = decode_hex("ciphertext", &envelope.cipher_text)?;
    let stored_mac = decode_hex("mac", &envelope.mac)?;

    if iv.len() != IV_LEN {
        return Err(KeyStoreError::Crypto(format!(
            "Invalid IV length: expected {}, got {}",
            IV_LEN,
            iv.len()
        )));
    }

    let key = derive_key(
        password.as_bytes(),
        &salt,
        params.n,
        params.r,
        params.p,
        params.dklen,
    )?;

    let mac = keccak_mac(key.mac_key(), &cipher_text);
    if !bool::from(mac.as_slice().ct_eq(&stored_mac)) {
        debug!("MAC mismatch while decrypting envelope");
        return Err(KeyStoreError::Integrity);
    }

    let plaintext = aes_ctr_xor(key.encryption_key(), &iv, &cipher_text)?;
    Ok(SecretBytes::new(plaintext))
}

fn aes_ctr_xor(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut cipher = Aes128Ctr::new_from_slices(key, iv)
        .map_err(|e| KeyStoreError::Crypto(format!("Invalid cipher key or IV: {}", e)))?;
    let mut output = data.to_vec();
    cipher.apply_keystream(&mut output);
    Ok(output)
}

fn keccak_mac(mac_key: &[u8], cipher_text: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(mac_key);
    hasher.update(cipher_text);
    let mut mac = [0u8; 32];
    mac.copy_from_slice(&hasher.finalize());
    mac
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| KeyStoreError::Crypto(format!("Invalid {} hex: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &str = "correct horse battery staple";

    fn test_cost() -> ScryptCost {
        ScryptCost::new(16, 1)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        for len in [0usize, 1, 16, 32, 57] {
            let plaintext: Vec<u8> = (0..len).map(|i| i as u8).collect();

            let envelope = encrypt(&plaintext, PASSWORD, test_cost()).unwrap();
            let decrypted = decrypt(&envelope, PASSWORD).unwrap();

            assert_eq!(decrypted.expose(), plaintext.as_slice(), "length {}", len);
        }
    }

    #[test]
    fn test_ciphertext_length_matches_plaintext() {
        for len in [0usize, 1, 15, 16, 17, 57] {
            let envelope = encrypt(&vec![0xAB; len], PASSWORD, test_cost()).unwrap();
            assert_eq!(envelope.cipher_text.len(), len * 2);
        }
    }

    #[test]
    fn test_envelope_parameters() {
        let envelope = encrypt(b"secret", PASSWORD, ScryptCost::new(32, 2)).unwrap();

        assert_eq!(envelope.cipher_name, "aes-128-ctr");
        assert_eq!(envelope.kdf_name, "scrypt");
        assert_eq!(envelope.iv().len(), IV_LEN * 2);
        assert_eq!(envelope.kdf_params.n, 32);
        assert_eq!(envelope.kdf_params.r, 8);
        assert_eq!(envelope.kdf_params.p, 2);
        assert_eq!(envelope.kdf_params.dklen, 32);
        assert_eq!(envelope.kdf_params.salt.len(), 64);
        assert_eq!(envelope.mac.len(), 64);
    }

    #[test]
    fn test_salt_and_iv_never_repeat() {
        let envelope1 = encrypt(b"same plaintext", PASSWORD, test_cost()).unwrap();
        let envelope2 = encrypt(b"same plaintext", PASSWORD, test_cost()).unwrap();

        assert_ne!(envelope1.kdf_params.salt, envelope2.kdf_params.salt);
        assert_ne!(envelope1.iv(), envelope2.iv());
        assert_ne!(envelope1.cipher_text, envelope2.cipher_text);
    }

    #[test]
    fn test_wrong_password_is_integrity_error() {
        let envelope = encrypt(b"secret data", PASSWORD, test_cost()).unwrap();

        let result = decrypt(&envelope, "wrong password");
        assert!(matches!(result, Err(KeyStoreError::Integrity)));
    }

    #[test]
    fn test_tampered_ciphertext_is_integrity_error() {
        let mut envelope = encrypt(b"secret data", PASSWORD, test_cost()).unwrap();
        let mut bytes = hex::decode(&envelope.cipher_text).unwrap();
        bytes[0] ^= 0xFF;
        envelope.cipher_text = hex::encode(bytes);

        let err = decrypt(&envelope, PASSWORD).unwrap_err();
        assert!(err.is_integrity_failure());
    }

    #[test]
    fn test_tampered_mac_is_integrity_error() {
        let mut envelope = encrypt(b"secret data", PASSWORD, test_cost()).unwrap();
        envelope.mac = hex::encode([0u8; 32]);

        let err = decrypt(&envelope, PASSWORD).unwrap_err();
        assert!(err.is_integrity_failure());
    }

    #[test]
    fn test_tampered_cost_is_crypto_error() {
        let envelope = encrypt(b"secret", PASSWORD, test_cost()).unwrap();

        let mut huge_n = envelope.clone();
        huge_n.kdf_params.n = 1 << 40;
        assert!(matches!(
            decrypt(&huge_n, PASSWORD),
            Err(KeyStoreError::Crypto(_))
        ));

        let mut huge_r = envelope.clone();
        huge_r.kdf_params.r = 1 << 20;
        assert!(matches!(
            decrypt(&huge_r, PASSWORD),
            Err(KeyStoreError::Crypto(_))
        ));

        let mut huge_p = envelope;
        huge_p.kdf_params.p = u32::MAX;
        assert!(matches!(
            decrypt(&huge_p, PASSWORD),
            Err(KeyStoreError::Crypto(_))
        ));
    }

    #[test]
    fn test_unsupported_kdf_rejected() {
        let mut envelope = encrypt(b"secret", PASSWORD, test_cost()).unwrap();
        envelope.kdf_name = "pbkdf2".to_string();

        let result = decrypt(&envelope, PASSWORD);
        assert!(matches!(result, Err(KeyStoreError::Crypto(_))));
    }

    #[test]
    fn test_unsupported_cipher_rejected() {
        let mut envelope = encrypt(b"secret", PASSWORD, test_cost()).unwrap();
        envelope.cipher_name = "aes-256-gcm".to_string();

        let result = decrypt(&envelope, PASSWORD);
        assert!(matches!(result, Err(KeyStoreError::Crypto(_))));
    }

    #[test]
    fn test_malformed_fields_rejected() {
        let envelope = encrypt(b"secret", PASSWORD, test_cost()).unwrap();

        let mut bad_hex = envelope.clone();
        bad_hex.cipher_text = "not hex".to_string();
        assert!(matches!(
            decrypt(&bad_hex, PASSWORD),
            Err(KeyStoreError::Crypto(_))
        ));

        let mut short_iv = envelope;
        short_iv.cipher_params.iv = "00ff".to_string();
        assert!(matches!(
            decrypt(&short_iv, PASSWORD),
            Err(KeyStoreError::Crypto(_))
        ));
    }

    #[test]
    fn test_json_field_names() {
        let envelope = encrypt(b"secret", PASSWORD, test_cost()).unwrap();
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["cipher"], "aes-128-ctr");
        assert!(value["ciphertext"].is_string());
        assert!(value["cipherparams"]["iv"].is_string());
        assert_eq!(value["kdf"], "scrypt");
        assert_eq!(value["kdfparams"]["n"], 16);
        assert_eq!(value["kdfparams"]["r"], 8);
        assert_eq!(value["kdfparams"]["p"], 1);
        assert_eq!(value["kdfparams"]["dklen"], 32);
        assert!(value["kdfparams"]["salt"].is_string());
        assert!(value["mac"].is_string());
    }

    // Reference vector from the Web3 Secret Storage definition (full cost).
    #[test]
    #[ignore = "slow: scrypt with N = 2^18"]
    fn test_web3_reference_vector() {
        let envelope = SecretStorageEnvelope {
            cipher_name: "aes-128-ctr".to_string(),
            cipher_text: "d172bf743a674da9cdad04534d56926ef8358534d458fffccd4e6ad2fbde479c"
                .to_string(),
            cipher_params: CipherParams {
                iv: "83dbcc02d8ccb40e466191a123791e0e".to_string(),
            },
            kdf_name: "scrypt".to_string(),
            kdf_params: ScryptParams {
                n: 262_144,
                r: 8,
                p: 1,
                dklen: 32,
                salt: "ab0c7876052600dd703518d6fc3fe8984592145b591fc8fb5c6d43190334ba19"
                    .to_string(),
            },
            mac: "2103ac29920d71da29f15d75b4a16dbe95cfd7ff8faea1056c33131d846e3097".to_string(),
        };

        let decrypted = decrypt(&envelope, "testpassword").unwrap();
        assert_eq!(
            hex::encode(decrypted.expose()),
            "7a28b5ba57c53603b0b07b56bba752f7784bf506fa95edc395f5cf6c7514fe9d"
        );
    }
}
