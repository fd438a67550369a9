//! Password-based key derivation using scrypt

use rand::{rngs::OsRng, RngCore};

use super::DerivedKey;
use crate::error::{KeyStoreError, Result};

/// Standard scrypt cost factor (2^18)
pub const SCRYPT_N: u64 = 1 << 18;
/// Standard scrypt parallelism
pub const SCRYPT_P: u32 = 1;
/// Light cost factor for interactive use (2^12)
pub const LIGHT_SCRYPT_N: u64 = 1 << 12;
/// Light parallelism
pub const LIGHT_SCRYPT_P: u32 = 6;
/// Block size, fixed by the format
pub const SCRYPT_R: u32 = 8;
/// Derived key length in bytes
pub const SCRYPT_DKLEN: usize = 32;
/// Salt length in bytes
pub const SALT_LEN: usize = 32;
/// Largest accepted N (2^20, about 1GB of memory at r = 8)
pub const MAX_SCRYPT_N: u64 = 1 << 20;
/// Largest accepted parallelism
pub const MAX_SCRYPT_P: u32 = 16;

/// Caller-tunable scrypt cost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptCost {
    /// CPU/memory cost factor N (power of two)
    pub n: u64,
    /// Parallelism p
    pub p: u32,
}

impl Default for ScryptCost {
    fn default() -> Self {
        Self {
            n: SCRYPT_N,
            p: SCRYPT_P,
        }
    }
}

impl ScryptCost {
    pub fn new(n: u64, p: u32) -> Self {
        Self { n, p }
    }

    /// Reduced cost: roughly 4MB of memory and a few milliseconds per derivation
    pub fn light() -> Self {
        Self {
            n: LIGHT_SCRYPT_N,
            p: LIGHT_SCRYPT_P,
        }
    }
}

/// Generate a cryptographically secure random salt
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive a 32-byte key from a password using scrypt
///
/// # Arguments
/// * `password` - The user's password
/// * `salt` - Salt bytes (use `generate_salt()` to create one)
/// * `n` - Cost factor, a power of two in `2..=MAX_SCRYPT_N`
/// * `r` - Block size; only `SCRYPT_R` is supported
/// * `p` - Parallelism in `1..=MAX_SCRYPT_P`
/// * `dklen` - Requested output length; only 32 is supported
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    n: u64,
    r: u32,
    p: u32,
    dklen: usize,
) -> Result<DerivedKey> {
    if dklen != SCRYPT_DKLEN {
        return Err(KeyStoreError::Crypto(format!(
            "Unsupported derived key length: expected {}, got {}",
            SCRYPT_DKLEN, dklen
        )));
    }
    if n < 2 || !n.is_power_of_two() {
        return Err(KeyStoreError::Crypto(format!(
            "Invalid scrypt N: {} is not a power of two",
            n
        )));
    }
    if n > MAX_SCRYPT_N {
        return Err(KeyStoreError::Crypto(format!(
            "scrypt N {} exceeds the maximum of {}",
            n, MAX_SCRYPT_N
        )));
    }
    if r != SCRYPT_R {
        return Err(KeyStoreError::Crypto(format!(
            "Unsupported scrypt r: expected {}, got {}",
            SCRYPT_R, r
        )));
    }
    if p == 0 || p > MAX_SCRYPT_P {
        return Err(KeyStoreError::Crypto(format!(
            "scrypt p {} outside 1..={}",
            p, MAX_SCRYPT_P
        )));
    }
    let log_n = n.trailing_zeros() as u8;

    let params = scrypt::Params::new(log_n, r, p, dklen)
        .map_err(|e| KeyStoreError::Crypto(format!("Invalid scrypt parameters: {}", e)))?;

    let mut output = [0u8; SCRYPT_DKLEN];
    scrypt::scrypt(password, salt, &params, &mut output)
        .map_err(|e| KeyStoreError::Crypto(format!("Key derivation failed: {}", e)))?;

    let key = DerivedKey::new(output);
    zeroize::Zeroize::zeroize(&mut output);
    Ok(key)
}
