//! File encryption.
//!
//! File contents are encrypted as raw bytes (no base64 inflation); the
//! resulting blob and its [`EncryptedFileMetadata`] are stored side by side
//! and must be handed back together to decrypt.

use std::path::Path;

use tracing::warn;

use crate::agreement::derive_shared_key;
use crate::cipher::{generate_nonce, open, seal};
use crate::envelope::{CipherSuite, EncryptedFileMetadata};
use crate::error::{CryptoError, CryptoResult};
use crate::format::base64_encode;
use crate::keys::{KeyPair, PublicKey};

/// MIME type used when content sniffing finds nothing.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A file about to be encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl PlainFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, sniffing its MIME type from the content.
    pub fn from_path(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = sniff_mime_type(&bytes);

        Ok(Self {
            name,
            mime_type,
            bytes,
        })
    }
}

/// Guess a MIME type from magic bytes.
pub fn sniff_mime_type(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

/// An encrypted blob with its metadata.
#[derive(Debug, Clone)]
pub struct EncryptedFile {
    pub ciphertext: Vec<u8>,
    pub metadata: EncryptedFileMetadata,
}

/// A decrypted file, tagged with the sender's original name and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedFile {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub name: String,
}

/// Encrypt a file from `sender` to `recipient`.
pub fn encrypt_file(
    sender: &KeyPair,
    recipient: &PublicKey,
    file: &PlainFile,
) -> CryptoResult<EncryptedFile> {
    let suite = CipherSuite::CURRENT;
    let shared = derive_shared_key(&sender.secret, recipient)?;
    let nonce = generate_nonce();
    let ciphertext = seal(shared.as_bytes(), &nonce, &file.bytes)?;

    let metadata = EncryptedFileMetadata {
        v: suite.version(),
        alg: suite.alg().to_string(),
        sender_pub_b64: sender.public.to_b64(),
        nonce_b64: base64_encode(&nonce),
        orig_name: file.name.clone(),
        orig_type: file.mime_type.clone(),
        orig_size: file.bytes.len() as u64,
        encrypted: true,
    };

    Ok(EncryptedFile {
        ciphertext,
        metadata,
    })
}

/// Decrypt a blob addressed to `recipient`.
pub fn decrypt_file(
    metadata: &EncryptedFileMetadata,
    ciphertext: &[u8],
    recipient: &KeyPair,
) -> CryptoResult<DecryptedFile> {
    let sender = match metadata.suite()? {
        CipherSuite::X25519XSalsa20Poly1305 => metadata.sender_public()?,
    };
    decrypt_file_with_peer(metadata, ciphertext, recipient, &sender)
}

/// Decrypt a blob using an explicit counterparty key.
pub fn decrypt_file_with_peer(
    metadata: &EncryptedFileMetadata,
    ciphertext: &[u8],
    own: &KeyPair,
    peer: &PublicKey,
) -> CryptoResult<DecryptedFile> {
    if !metadata.encrypted {
        return Err(CryptoError::Encoding(
            "Metadata does not describe an encrypted file".to_string(),
        ));
    }

    let bytes = match metadata.suite()? {
        CipherSuite::X25519XSalsa20Poly1305 => {
            let nonce = metadata.nonce()?;
            let shared = derive_shared_key(&own.secret, peer)?;
            open(shared.as_bytes(), &nonce, ciphertext)?
        }
    };

    // origSize is outside the MAC; trust the authenticated bytes.
    if bytes.len() as u64 != metadata.orig_size {
        warn!(
            subsystem = "crypto",
            component = "file",
            op = "decrypt",
            expected = metadata.orig_size,
            output_len = bytes.len(),
            "Decrypted size differs from origSize"
        );
    }

    Ok(DecryptedFile {
        bytes,
        mime_type: metadata.orig_type.clone(),
        name: metadata.orig_name.clone(),
    })
}
