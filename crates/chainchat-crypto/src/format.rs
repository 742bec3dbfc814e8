//! Shared wire-format constants and the base64 codec.
//!
//! Every binary field that travels inside a JSON envelope is encoded with
//! the standard base64 alphabet, padded.

use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

/// Current envelope format version (`v`).
pub const ENVELOPE_VERSION: u32 = 1;

/// Cipher suite identifier (`alg`) for X25519 + XSalsa20-Poly1305.
pub const SUITE_ALG: &str = "x25519-xsalsa20poly1305";

/// X25519 key length in bytes (public and secret).
pub const KEY_LEN: usize = 32;

/// XSalsa20 nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// Poly1305 authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Encode bytes as base64.
pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode a base64 string to bytes.
pub fn base64_decode(data: &str) -> CryptoResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| CryptoError::Encoding(format!("Invalid base64: {}", e)))
}

/// Decode a base64 key, requiring exactly [`KEY_LEN`] bytes.
///
/// Surrounding whitespace from copy/paste is ignored. Anything else that is
/// not a 32-byte key is rejected rather than truncated or padded.
pub fn decode_key_b64(data: &str) -> CryptoResult<[u8; KEY_LEN]> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| CryptoError::MalformedKey(format!("Invalid base64: {}", e)))?;

    bytes.as_slice().try_into().map_err(|_| {
        CryptoError::MalformedKey(format!(
            "Expected {} bytes, got {}",
            KEY_LEN,
            bytes.len()
        ))
    })
}

/// Decode a base64 nonce, requiring exactly [`NONCE_LEN`] bytes.
pub fn decode_nonce_b64(data: &str) -> CryptoResult<[u8; NONCE_LEN]> {
    let bytes = base64_decode(data)?;
    bytes.as_slice().try_into().map_err(|_| {
        CryptoError::Encoding(format!(
            "Invalid nonce length: expected {}, got {}",
            NONCE_LEN,
            bytes.len()
        ))
    })
}
