//! X25519 identity keys.
//!
//! This module provides:
//! - Keypair generation using X25519 (Curve25519)
//! - Base64 import/export of public and secret keys
//! - The persisted identity record (`{publicKey_b64, secretKey_b64}`)
//!
//! # Security
//!
//! - Secret keys are zeroized on drop and redacted from `Debug`
//! - A stored record is only accepted if its secret derives its public key

use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_encode, decode_key_b64, KEY_LEN};

/// X25519 public key (32 bytes).
///
/// Public keys are shared out-of-band with friends, who use them to encrypt
/// messages only the matching secret key can open.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; KEY_LEN]);

impl PublicKey {
    /// Create a public key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Decode a base64 public key.
    ///
    /// Fails with [`CryptoError::MalformedKey`] unless the input decodes to
    /// exactly 32 bytes.
    pub fn from_b64(encoded: &str) -> CryptoResult<Self> {
        decode_key_b64(encoded).map(Self)
    }

    /// Get the raw bytes of the public key.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Encode as base64 for sharing.
    pub fn to_b64(&self) -> String {
        base64_encode(&self.0)
    }

    /// Convert to the x25519-dalek public key type.
    pub(crate) fn to_x25519(&self) -> X25519Public {
        X25519Public::from(self.0)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0[..8]))
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_b64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_b64(&s).map_err(serde::de::Error::custom)
    }
}

/// X25519 secret key (32 bytes) with automatic zeroization.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    /// Create a secret key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Decode a base64 secret key.
    pub fn from_b64(encoded: &str) -> CryptoResult<Self> {
        decode_key_b64(encoded).map(Self)
    }

    /// Get the raw bytes of the secret key.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Encode as base64 for the local identity record only.
    pub(crate) fn to_b64(&self) -> String {
        base64_encode(&self.0)
    }

    /// Convert to the x25519-dalek static secret type.
    pub(crate) fn to_x25519(&self) -> StaticSecret {
        StaticSecret::from(self.0)
    }

    /// Derive the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        let secret = self.to_x25519();
        let public = X25519Public::from(&secret);
        PublicKey(*public.as_bytes())
    }
}

impl Clone for SecretKey {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// X25519 keypair for one messaging identity.
#[derive(Clone)]
pub struct KeyPair {
    /// The public key (shared with friends).
    pub public: PublicKey,
    /// The secret key (never leaves the device).
    pub secret: SecretKey,
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut secret_bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut secret_bytes);

        let secret = StaticSecret::from(secret_bytes);
        let public = X25519Public::from(&secret);

        secret_bytes.zeroize();

        Self {
            public: PublicKey(*public.as_bytes()),
            secret: SecretKey(secret.to_bytes()),
        }
    }

    /// Create a keypair from an existing secret key.
    pub fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { public, secret }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Persisted identity record.
///
/// Stored verbatim as JSON in the key store. Losing it means losing the
/// ability to decrypt every message addressed to this identity.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct IdentityRecord {
    #[serde(rename = "publicKey_b64")]
    pub public_key_b64: String,
    #[serde(rename = "secretKey_b64")]
    pub secret_key_b64: String,
}

impl IdentityRecord {
    /// Build the record for a keypair.
    pub fn from_keypair(keypair: &KeyPair) -> Self {
        Self {
            public_key_b64: keypair.public.to_b64(),
            secret_key_b64: keypair.secret.to_b64(),
        }
    }

    /// Parse a stored record.
    pub fn from_json(json: &str) -> CryptoResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            CryptoError::MalformedKey(format!("Stored identity record is unreadable: {}", e))
        })
    }

    /// Serialize for storage.
    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode into a keypair, checking that both halves belong together.
    pub fn to_keypair(&self) -> CryptoResult<KeyPair> {
        let public = PublicKey::from_b64(&self.public_key_b64)?;
        let secret = SecretKey::from_b64(&self.secret_key_b64)?;

        if secret.public_key() != public {
            return Err(CryptoError::MalformedKey(
                "Stored identity keypair is inconsistent".to_string(),
            ));
        }

        Ok(KeyPair { public, secret })
    }
}

impl std::fmt::Debug for IdentityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityRecord")
            .field("public_key_b64", &self.public_key_b64)
            .field("secret_key_b64", &"[REDACTED]")
            .finish()
    }
}
