//! Error types for messaging cryptography.

use thiserror::Error;

/// Cryptographic operation errors.
///
/// Every failure is explicit: callers render `DecryptionFailed` as an
/// "unable to decrypt" placeholder and `Encoding` as a corrupt message,
/// never as partially decoded text.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The durable key store is missing, unreadable, or cannot be unlocked.
    #[error("Key storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A key is not valid base64, has the wrong length, or is not usable on the curve.
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    /// Authenticated decryption failed - wrong key or tampered data.
    #[error("Decryption failed - wrong key or tampered data")]
    DecryptionFailed,

    /// A payload could not be parsed before decryption was attempted.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The envelope names a format version or cipher suite this build does not know.
    #[error("Unsupported cipher suite: v{version} {alg}")]
    UnsupportedSuite { version: u32, alg: String },

    /// No messaging key has been imported for a peer.
    #[error("No messaging key for peer: {0}")]
    UnknownPeer(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Passphrase too short.
    #[error("Passphrase too short (minimum {0} characters required)")]
    PassphraseTooShort(usize),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CryptoError {
    fn from(e: serde_json::Error) -> Self {
        CryptoError::Encoding(e.to_string())
    }
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
