//! # chainchat-crypto
//!
//! End-to-end encryption for chainchat messages and attachments.
//!
//! Every user holds one long-lived X25519 identity key. Friends exchange
//! public keys out-of-band; after that, each text message or file is sealed
//! for exactly one peer and can be stored on a public, content-addressed
//! medium without exposing its contents.
//!
//! ## Cryptographic Primitives
//!
//! - **Key agreement**: X25519 followed by HSalsa20 (NaCl `box.before`)
//! - **Symmetric cipher**: XSalsa20-Poly1305 with a random 24-byte nonce
//! - **Key store sealing**: Argon2id + AES-256-GCM
//! - **Fingerprints**: BLAKE3 hash with Base58 encoding and a checksum
//!
//! Envelopes are byte-compatible with libsodium / `crypto_box` `box`.
//!
//! ## Examples
//!
//! ### Exchange a message
//!
//! ```rust
//! use chainchat_crypto::Messenger;
//!
//! let alice = Messenger::in_memory();
//! let bob = Messenger::in_memory();
//!
//! // Out-of-band: Bob gives Alice his public key.
//! alice
//!     .set_friend_messaging_key_b64("0xB0B", &bob.my_public_key_b64().unwrap())
//!     .unwrap();
//!
//! let envelope = alice.encrypt_text_for_peer("0xb0b", "gm fren").unwrap();
//! let json = envelope.to_json().unwrap();
//!
//! assert_eq!(bob.decrypt_text_json(&json, None).unwrap(), "gm fren");
//! ```
//!
//! ### Encrypt a file
//!
//! ```rust
//! use chainchat_crypto::{Messenger, PlainFile};
//!
//! let alice = Messenger::in_memory();
//! let bob = Messenger::in_memory();
//!
//! let photo = PlainFile::new("cat.png", "image/png", vec![0x89, b'P', b'N', b'G']);
//! let encrypted = alice
//!     .encrypt_file_for(&bob.my_public_key_b64().unwrap(), &photo)
//!     .unwrap();
//!
//! let restored = bob
//!     .decrypt_file_blob(&encrypted.metadata, &encrypted.ciphertext)
//!     .unwrap();
//! assert_eq!(restored.bytes, photo.bytes);
//! assert_eq!(restored.mime_type, "image/png");
//! ```
//!
//! ### Persist keys on disk
//!
//! ```rust
//! use std::sync::Arc;
//! use chainchat_crypto::{FileKeyStore, Messenger};
//!
//! # let temp = tempfile::tempdir().unwrap();
//! # let path = temp.path().join("keystore.json");
//! let store = Arc::new(FileKeyStore::open(&path).unwrap());
//! let me = Messenger::new(store);
//! println!("Share this key: {}", me.my_public_key_b64().unwrap());
//! ```
//!
//! ### Payload detection
//!
//! ```rust
//! use chainchat_crypto::{detect_payload, PayloadKind};
//!
//! match detect_payload(b"gm fren") {
//!     PayloadKind::EncryptedText => println!("encrypted text"),
//!     PayloadKind::EncryptedFile => println!("encrypted file"),
//!     PayloadKind::Plain => println!("legacy plaintext"),
//! }
//! ```

pub mod agreement;
pub mod cipher;
pub mod content_ref;
pub mod detect;
pub mod envelope;
pub mod error;
pub mod file;
pub mod fingerprint;
pub mod format;
pub mod identity;
pub mod keys;
pub mod keystore;
pub mod messenger;
pub mod registry;
pub mod text;

// Re-export commonly used types
pub use agreement::{derive_shared_key, SharedKey};
pub use content_ref::{ContentRef, MessageBody};
pub use detect::{detect_payload, is_encrypted, PayloadKind};
pub use envelope::{CipherSuite, EncryptedFileMetadata, EncryptedTextEnvelope};
pub use error::{CryptoError, CryptoResult};
pub use file::{DecryptedFile, EncryptedFile, PlainFile};
pub use fingerprint::KeyFingerprint;
pub use format::{base64_decode, base64_encode};
pub use identity::IdentityKeyManager;
pub use keys::{IdentityRecord, KeyPair, PublicKey, SecretKey};
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyStore};
pub use messenger::Messenger;
pub use registry::PeerKeyRegistry;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::sync::Arc;

    /// Full flow: identity -> friend import -> encrypt -> detect -> decrypt.
    #[test]
    fn test_full_messaging_workflow() {
        let alice = Messenger::in_memory();
        let bob = Messenger::in_memory();

        alice
            .set_friend_messaging_key_b64("bob", &bob.my_public_key_b64().unwrap())
            .unwrap();

        let envelope = alice.encrypt_text_for_peer("bob", "meet at noon").unwrap();
        let json = envelope.to_json().unwrap();

        assert_eq!(detect_payload(json.as_bytes()), PayloadKind::EncryptedText);
        assert_eq!(bob.decrypt_text_json(&json, None).unwrap(), "meet at noon");

        // Eve cannot decrypt
        let eve = Messenger::in_memory();
        assert!(eve.decrypt_text_json(&json, None).is_err());
    }

    /// Identity survives reopening the store.
    #[test]
    fn test_identity_persistence() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("keystore.json");

        let first = Messenger::new(Arc::new(FileKeyStore::open(&path).unwrap()));
        let original = first.my_public_key_b64().unwrap();
        drop(first);

        let second = Messenger::new(Arc::new(FileKeyStore::open(&path).unwrap()));
        assert_eq!(second.my_public_key_b64().unwrap(), original);
    }

    /// On-chain body points at a stored envelope.
    #[test]
    fn test_message_body_reference() {
        let body = MessageBody::parse("cid:bafkreiabc123");
        match body {
            MessageBody::Reference(r) => assert_eq!(r.address(), "bafkreiabc123"),
            MessageBody::Inline(_) => panic!("expected a reference"),
        }
    }
}
