//! Payload detection for fetched content.
//!
//! Conversations mix legacy plaintext uploads with encrypted envelopes;
//! consumers classify each payload before deciding how to render it.

use serde_json::Value;

/// What a fetched payload contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// A text envelope (`ct_b64` present).
    EncryptedText,
    /// File metadata with `encrypted: true`; the blob lives elsewhere.
    EncryptedFile,
    /// Anything else: legacy plaintext, media bytes, unrelated JSON.
    Plain,
}

impl PayloadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadKind::EncryptedText => "encrypted_text",
            PayloadKind::EncryptedFile => "encrypted_file",
            PayloadKind::Plain => "plain",
        }
    }
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const HEADER_FIELDS: [&str; 4] = ["v", "alg", "senderPub_b64", "nonce_b64"];

/// Classify a payload from its bytes.
///
/// Only the envelope shape is checked; whether it actually decrypts is
/// decided later.
pub fn detect_payload(data: &[u8]) -> PayloadKind {
    let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(data) else {
        return PayloadKind::Plain;
    };

    if !HEADER_FIELDS.iter().all(|field| map.contains_key(*field)) {
        return PayloadKind::Plain;
    }

    if map.get("encrypted") == Some(&Value::Bool(true)) {
        PayloadKind::EncryptedFile
    } else if map.get("ct_b64").map_or(false, Value::is_string) {
        PayloadKind::EncryptedText
    } else {
        PayloadKind::Plain
    }
}

/// Check if a payload is any kind of encrypted envelope.
pub fn is_encrypted(data: &[u8]) -> bool {
    !matches!(detect_payload(data), PayloadKind::Plain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{encrypt_file, PlainFile};
    use crate::keys::KeyPair;
    use crate::text::encrypt_text;

    #[test]
    fn test_detect_text_envelope() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let env = encrypt_text(&alice, &bob.public, "gm").unwrap();
        let json = env.to_json().unwrap();

        assert_eq!(detect_payload(json.as_bytes()), PayloadKind::EncryptedText);
        assert!(is_encrypted(json.as_bytes()));
    }

    #[test]
    fn test_detect_file_metadata() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let file = PlainFile::new("a.txt", "text/plain", b"hello".to_vec());
        let enc = encrypt_file(&alice, &bob.public, &file).unwrap();
        let json = enc.metadata.to_json().unwrap();

        assert_eq!(detect_payload(json.as_bytes()), PayloadKind::EncryptedFile);
    }

    #[test]
    fn test_detect_plain() {
        assert_eq!(detect_payload(b"gm fren"), PayloadKind::Plain);
        assert_eq!(detect_payload(b""), PayloadKind::Plain);
        assert_eq!(detect_payload(br#"{"hello":"world"}"#), PayloadKind::Plain);
        assert_eq!(detect_payload(b"[1,2,3]"), PayloadKind::Plain);
        assert!(!is_encrypted(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn test_detect_file_flag_false_is_plain() {
        let json = br#"{"v":1,"alg":"x","senderPub_b64":"a","nonce_b64":"b","encrypted":false}"#;
        assert_eq!(detect_payload(json), PayloadKind::Plain);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(PayloadKind::EncryptedText.to_string(), "encrypted_text");
        assert_eq!(PayloadKind::EncryptedFile.to_string(), "encrypted_file");
        assert_eq!(PayloadKind::Plain.to_string(), "plain");
    }
}
