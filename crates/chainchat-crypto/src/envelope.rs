//! Envelope codec for encrypted text and file metadata.
//!
//! # Text envelope
//!
//! ```json
//! {
//!   "v": 1,
//!   "alg": "x25519-xsalsa20poly1305",
//!   "senderPub_b64": "<base64, 32 bytes>",
//!   "nonce_b64": "<base64, 24 bytes>",
//!   "ct_b64": "<base64, ciphertext + 16-byte tag>"
//! }
//! ```
//!
//! # File metadata
//!
//! Same header fields without `ct_b64`, plus `origName`, `origType`,
//! `origSize` and `encrypted: true`. The ciphertext travels as a separate
//! raw blob.
//!
//! Field names are part of the stored format and must not change.

use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode, decode_nonce_b64, ENVELOPE_VERSION, NONCE_LEN, SUITE_ALG};
use crate::keys::PublicKey;

/// Cipher suite named by an envelope's `(v, alg)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherSuite {
    /// X25519 agreement, HSalsa20 key, XSalsa20-Poly1305 (NaCl `box`).
    X25519XSalsa20Poly1305,
}

impl CipherSuite {
    /// Suite used for new envelopes.
    pub const CURRENT: CipherSuite = CipherSuite::X25519XSalsa20Poly1305;

    /// Resolve the suite for an incoming envelope.
    pub fn from_tag(version: u32, alg: &str) -> CryptoResult<Self> {
        match (version, alg) {
            (ENVELOPE_VERSION, SUITE_ALG) => Ok(CipherSuite::X25519XSalsa20Poly1305),
            _ => Err(CryptoError::UnsupportedSuite {
                version,
                alg: alg.to_string(),
            }),
        }
    }

    /// The `v` field for this suite.
    pub fn version(self) -> u32 {
        match self {
            CipherSuite::X25519XSalsa20Poly1305 => ENVELOPE_VERSION,
        }
    }

    /// The `alg` field for this suite.
    pub fn alg(self) -> &'static str {
        match self {
            CipherSuite::X25519XSalsa20Poly1305 => SUITE_ALG,
        }
    }
}

/// Encrypted text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedTextEnvelope {
    pub v: u32,
    pub alg: String,
    #[serde(rename = "senderPub_b64")]
    pub sender_pub_b64: String,
    pub nonce_b64: String,
    pub ct_b64: String,
}

impl EncryptedTextEnvelope {
    /// Parse an envelope from JSON.
    ///
    /// Malformed JSON and missing fields are [`CryptoError::Encoding`].
    pub fn from_json(json: &str) -> CryptoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Resolve the cipher suite.
    pub fn suite(&self) -> CryptoResult<CipherSuite> {
        CipherSuite::from_tag(self.v, &self.alg)
    }

    /// The sender's public key.
    pub fn sender_public(&self) -> CryptoResult<PublicKey> {
        PublicKey::from_b64(&self.sender_pub_b64)
    }

    /// The 24-byte nonce.
    pub fn nonce(&self) -> CryptoResult<[u8; NONCE_LEN]> {
        decode_nonce_b64(&self.nonce_b64)
    }

    /// The ciphertext with its authentication tag.
    pub fn ciphertext(&self) -> CryptoResult<Vec<u8>> {
        base64_decode(&self.ct_b64)
    }
}

/// Metadata describing an encrypted file blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedFileMetadata {
    pub v: u32,
    pub alg: String,
    #[serde(rename = "senderPub_b64")]
    pub sender_pub_b64: String,
    pub nonce_b64: String,
    #[serde(rename = "origName")]
    pub orig_name: String,
    #[serde(rename = "origType")]
    pub orig_type: String,
    #[serde(rename = "origSize")]
    pub orig_size: u64,
    pub encrypted: bool,
}

impl EncryptedFileMetadata {
    /// Parse metadata from JSON.
    pub fn from_json(json: &str) -> CryptoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Resolve the cipher suite.
    pub fn suite(&self) -> CryptoResult<CipherSuite> {
        CipherSuite::from_tag(self.v, &self.alg)
    }

    /// The sender's public key.
    pub fn sender_public(&self) -> CryptoResult<PublicKey> {
        PublicKey::from_b64(&self.sender_pub_b64)
    }

    /// The 24-byte nonce.
    pub fn nonce(&self) -> CryptoResult<[u8; NONCE_LEN]> {
        decode_nonce_b64(&self.nonce_b64)
    }
}
