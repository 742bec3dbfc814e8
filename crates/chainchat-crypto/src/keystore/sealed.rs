//! Passphrase sealing for on-disk key stores.
//!
//! The whole store document is encrypted with AES-256-GCM under a key
//! derived from a passphrase with Argon2id.
//!
//! # Format: CCSTORE1
//!
//! ```text
//! +------------------+
//! | Magic: CCSTORE1  | 8 bytes
//! +------------------+
//! | Header Length    | 4 bytes (little-endian)
//! +------------------+
//! | Header (JSON)    | Variable
//! +------------------+
//! | Encrypted Store  | Variable (JSON document + 16-byte auth tag)
//! +------------------+
//! ```

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::generate_random;
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode, base64_encode};

/// Magic bytes for a sealed key store.
pub const MAGIC_STORE: &[u8; 8] = b"CCSTORE1";

/// Minimum passphrase length.
pub const MIN_PASSPHRASE_LENGTH: usize = 12;

const FORMAT_VERSION: u8 = 1;
const KDF_ARGON2ID: &str = "argon2id";
const SALT_LEN: usize = 32;
const GCM_NONCE_LEN: usize = 12;
const PREAMBLE_LEN: usize = 12;

/// Argon2id parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory in KiB (default: 65536 = 64 MiB).
    pub memory_kib: u32,
    /// Time iterations (default: 3).
    pub iterations: u32,
    /// Parallelism degree (default: 4).
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MiB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Create low-memory parameters (for resource-constrained environments).
    pub fn low_memory() -> Self {
        Self {
            memory_kib: 32768, // 32 MiB
            iterations: 4,
            parallelism: 4,
        }
    }
}

/// Store key with automatic zeroization on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct StoreKey([u8; 32]);

/// Header for sealed store files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedHeader {
    /// Format version.
    pub version: u8,
    /// KDF algorithm (always "argon2id").
    pub kdf: String,
    /// KDF parameters.
    pub kdf_params: KdfParams,
    /// Salt for key derivation (base64).
    pub salt: String,
    /// Nonce for encryption (base64).
    pub nonce: String,
    /// When this copy of the store was written.
    pub created_at: DateTime<Utc>,
}

/// Reject passphrases below [`MIN_PASSPHRASE_LENGTH`] characters.
pub fn check_passphrase(passphrase: &str) -> CryptoResult<()> {
    if passphrase.chars().count() < MIN_PASSPHRASE_LENGTH {
        return Err(CryptoError::PassphraseTooShort(MIN_PASSPHRASE_LENGTH));
    }
    Ok(())
}

fn derive_store_key(
    passphrase: &str,
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> CryptoResult<StoreKey> {
    check_passphrase(passphrase)?;

    let argon2_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(StoreKey(key))
}

/// Encrypt a store document with a passphrase.
///
/// Every call draws a fresh salt and nonce.
pub fn seal_document(
    plaintext: &[u8],
    passphrase: &str,
    params: &KdfParams,
) -> CryptoResult<Vec<u8>> {
    let salt: [u8; SALT_LEN] = generate_random();
    let nonce: [u8; GCM_NONCE_LEN] = generate_random();

    let key = derive_store_key(passphrase, &salt, params)?;
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".into()))?;

    let header = SealedHeader {
        version: FORMAT_VERSION,
        kdf: KDF_ARGON2ID.to_string(),
        kdf_params: params.clone(),
        salt: base64_encode(&salt),
        nonce: base64_encode(&nonce),
        created_at: Utc::now(),
    };

    let header_json = serde_json::to_vec(&header)
        .map_err(|e| CryptoError::Encryption(format!("Header serialization failed: {}", e)))?;
    let header_len = (header_json.len() as u32).to_le_bytes();

    let mut output = Vec::with_capacity(PREAMBLE_LEN + header_json.len() + ciphertext.len());
    output.extend_from_slice(MAGIC_STORE);
    output.extend_from_slice(&header_len);
    output.extend_from_slice(&header_json);
    output.extend_from_slice(&ciphertext);

    Ok(output)
}

/// Decrypt a sealed store document.
///
/// A wrong passphrase and a damaged file look the same from here; both
/// surface as [`CryptoError::StorageUnavailable`].
pub fn open_document(sealed: &[u8], passphrase: &str) -> CryptoResult<Vec<u8>> {
    let (header, body_start) = read_header(sealed)?;

    if header.version != FORMAT_VERSION || header.kdf != KDF_ARGON2ID {
        return Err(unavailable(format!(
            "Unsupported sealed store: version {} kdf {}",
            header.version, header.kdf
        )));
    }

    let salt: [u8; SALT_LEN] = base64_decode(&header.salt)
        .ok()
        .and_then(|salt| salt.try_into().ok())
        .ok_or_else(|| unavailable("Invalid salt in sealed store header".to_string()))?;
    let nonce: [u8; GCM_NONCE_LEN] = base64_decode(&header.nonce)
        .ok()
        .and_then(|nonce| nonce.try_into().ok())
        .ok_or_else(|| unavailable("Invalid nonce in sealed store header".to_string()))?;

    let key = derive_store_key(passphrase, &salt, &header.kdf_params)?;
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(&nonce), &sealed[body_start..])
        .map_err(|_| unavailable("Wrong passphrase or corrupted key store".to_string()))
}

/// Check whether data starts with the sealed store magic.
pub fn is_sealed(data: &[u8]) -> bool {
    data.len() >= MAGIC_STORE.len() && &data[..MAGIC_STORE.len()] == MAGIC_STORE
}

/// Parse the header, returning it along with the offset of the ciphertext.
fn read_header(sealed: &[u8]) -> CryptoResult<(SealedHeader, usize)> {
    if !is_sealed(sealed) {
        return Err(unavailable("Not a sealed key store".to_string()));
    }
    if sealed.len() < PREAMBLE_LEN {
        return Err(unavailable("Sealed key store truncated".to_string()));
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&sealed[8..PREAMBLE_LEN]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;

    let header_end = PREAMBLE_LEN
        .checked_add(header_len)
        .filter(|end| *end <= sealed.len())
        .ok_or_else(|| unavailable("Sealed key store truncated".to_string()))?;

    let header: SealedHeader = serde_json::from_slice(&sealed[PREAMBLE_LEN..header_end])
        .map_err(|e| unavailable(format!("Invalid sealed store header: {}", e)))?;

    Ok((header, header_end))
}

fn unavailable(msg: String) -> CryptoError {
    CryptoError::StorageUnavailable(msg)
}
