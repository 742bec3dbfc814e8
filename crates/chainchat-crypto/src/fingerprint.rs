//! Key fingerprints for out-of-band comparison.
//!
//! Two people comparing a 44-character base64 key over a call will skip
//! characters. A fingerprint is shorter and self-checking:
//!
//! ```text
//! ccfp:<base58(version || hash || checksum)>
//!
//! - version:  1 byte (0x01)
//! - hash:     BLAKE3(public_key)[..20]
//! - checksum: BLAKE3(version || hash)[..4]
//! ```
//!
//! Matching fingerprints mean the keys match. They do not say who owns the
//! key; that still has to be established by the people comparing them.

use std::fmt;
use std::str::FromStr;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::PublicKey;

const FINGERPRINT_VERSION: u8 = 0x01;

/// Fingerprint prefix.
pub const FINGERPRINT_PREFIX: &str = "ccfp:";

const HASH_LEN: usize = 20;
const CHECKSUM_LEN: usize = 4;
const PAYLOAD_LEN: usize = 1 + HASH_LEN + CHECKSUM_LEN;

/// Short checksummed display form of a public key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyFingerprint(String);

fn checksum(version: u8, hash: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[version]);
    hasher.update(hash);
    let digest = hasher.finalize();

    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest.as_bytes()[..CHECKSUM_LEN]);
    out
}

impl KeyFingerprint {
    /// Compute the fingerprint of a public key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = blake3::hash(public_key.as_bytes());
        let hash = &digest.as_bytes()[..HASH_LEN];

        let mut payload = Vec::with_capacity(PAYLOAD_LEN);
        payload.push(FINGERPRINT_VERSION);
        payload.extend_from_slice(hash);
        payload.extend_from_slice(&checksum(FINGERPRINT_VERSION, hash));

        Self(format!(
            "{}{}",
            FINGERPRINT_PREFIX,
            bs58::encode(&payload).into_string()
        ))
    }

    /// Parse a fingerprint typed or pasted by a person.
    ///
    /// The checksum catches transcription errors.
    pub fn parse(s: &str) -> CryptoResult<Self> {
        let s = s.trim();
        let encoded = s.strip_prefix(FINGERPRINT_PREFIX).ok_or_else(|| {
            CryptoError::InvalidInput(format!(
                "Fingerprint must start with '{}'",
                FINGERPRINT_PREFIX
            ))
        })?;

        let payload = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| CryptoError::InvalidInput(format!("Invalid Base58: {}", e)))?;

        if payload.len() != PAYLOAD_LEN {
            return Err(CryptoError::InvalidInput(format!(
                "Invalid fingerprint length: expected {}, got {}",
                PAYLOAD_LEN,
                payload.len()
            )));
        }

        let version = payload[0];
        if version != FINGERPRINT_VERSION {
            return Err(CryptoError::InvalidInput(format!(
                "Unsupported fingerprint version: {}",
                version
            )));
        }

        let hash = &payload[1..1 + HASH_LEN];
        if payload[1 + HASH_LEN..] != checksum(version, hash) {
            return Err(CryptoError::InvalidInput(
                "Fingerprint checksum mismatch".to_string(),
            ));
        }

        Ok(Self(s.to_string()))
    }

    /// Whether this fingerprint belongs to `public_key`.
    pub fn matches(&self, public_key: &PublicKey) -> bool {
        *self == Self::from_public_key(public_key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyFingerprint({})", self.0)
    }
}

impl FromStr for KeyFingerprint {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for KeyFingerprint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl PublicKey {
    /// Fingerprint of this key.
    pub fn fingerprint(&self) -> KeyFingerprint {
        KeyFingerprint::from_public_key(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    #[test]
    fn test_fingerprint_shape() {
        let kp = KeyPair::generate();
        let fp = kp.public.fingerprint();

        assert!(fp.as_str().starts_with("ccfp:"));
        assert!(fp.as_str().len() > 30);
        assert!(fp.as_str().len() < 45);
    }

    #[test]
    fn test_fingerprint_deterministic_and_unique() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();

        assert_eq!(kp1.public.fingerprint(), kp1.public.fingerprint());
        assert_ne!(kp1.public.fingerprint(), kp2.public.fingerprint());
    }

    #[test]
    fn test_parse_roundtrip_and_matches() {
        let kp = KeyPair::generate();
        let fp = kp.public.fingerprint();

        let parsed: KeyFingerprint = format!("  {}\n", fp).parse().unwrap();
        assert_eq!(parsed, fp);
        assert!(parsed.matches(&kp.public));
        assert!(!parsed.matches(&KeyPair::generate().public));
    }

    #[test]
    fn test_parse_rejects_bad_prefix() {
        let err = KeyFingerprint::parse("mm:abc").unwrap_err();
        assert!(err.to_string().contains("must start with"));
    }

    #[test]
    fn test_parse_rejects_bad_base58() {
        assert!(KeyFingerprint::parse("ccfp:0OIl").is_err());
    }

    #[test]
    fn test_parse_rejects_typo() {
        let fp = KeyPair::generate().public.fingerprint();

        let mut corrupted = fp.as_str().to_string();
        let last = corrupted.pop().unwrap();
        corrupted.push(if last == 'A' { 'B' } else { 'A' });

        assert!(KeyFingerprint::parse(&corrupted).is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let fp = KeyPair::generate().public.fingerprint();
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{}\"", fp));
    }
}
