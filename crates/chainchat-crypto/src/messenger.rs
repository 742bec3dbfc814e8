//! High-level messaging facade.
//!
//! [`Messenger`] ties the local identity, the peer registry and the ciphers
//! together over one key store. It is what the rest of the application
//! talks to.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use crate::agreement::{self, SharedKey};
use crate::envelope::{EncryptedFileMetadata, EncryptedTextEnvelope};
use crate::error::{CryptoError, CryptoResult};
use crate::file::{self, DecryptedFile, EncryptedFile, PlainFile};
use crate::fingerprint::KeyFingerprint;
use crate::identity::IdentityKeyManager;
use crate::keys::{KeyPair, PublicKey};
use crate::keystore::{KeyStore, MemoryKeyStore};
use crate::registry::{normalize_peer_id, PeerKeyRegistry};
use crate::text;

/// End-to-end encryption for one local identity.
#[derive(Debug)]
pub struct Messenger {
    identity: IdentityKeyManager,
    peers: PeerKeyRegistry,
}

impl Messenger {
    /// Messenger over the unscoped namespace of `store`.
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self::with_scope(store, None)
    }

    /// Messenger for one local account (e.g. a wallet address).
    pub fn with_scope(store: Arc<dyn KeyStore>, scope: Option<&str>) -> Self {
        Self {
            identity: IdentityKeyManager::with_scope(store.clone(), scope),
            peers: PeerKeyRegistry::with_scope(store, scope),
        }
    }

    /// Messenger backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyStore::new()))
    }

    pub fn identity(&self) -> &IdentityKeyManager {
        &self.identity
    }

    pub fn peers(&self) -> &PeerKeyRegistry {
        &self.peers
    }

    // ---- identity -------------------------------------------------------

    pub fn get_or_create_my_keypair(&self) -> CryptoResult<KeyPair> {
        self.identity.get_or_create_keypair()
    }

    pub fn my_public_key_b64(&self) -> CryptoResult<String> {
        self.identity.public_key_b64()
    }

    pub fn my_fingerprint(&self) -> CryptoResult<KeyFingerprint> {
        Ok(self.get_or_create_my_keypair()?.public.fingerprint())
    }

    // ---- peers ----------------------------------------------------------

    pub fn friend_messaging_key_b64(&self, peer_id: &str) -> CryptoResult<Option<String>> {
        self.peers.friend_key_b64(peer_id)
    }

    pub fn set_friend_messaging_key_b64(&self, peer_id: &str, pub_b64: &str) -> CryptoResult<()> {
        self.peers.set_friend_key_b64(peer_id, pub_b64)
    }

    pub fn remove_friend_messaging_key(&self, peer_id: &str) -> CryptoResult<()> {
        self.peers.remove_friend_key(peer_id)
    }

    fn peer_public_key(&self, peer_id: &str) -> CryptoResult<PublicKey> {
        self.peers
            .friend_public_key(peer_id)?
            .ok_or_else(|| match normalize_peer_id(peer_id) {
                Ok(peer) => CryptoError::UnknownPeer(peer),
                Err(e) => e,
            })
    }

    // ---- agreement ------------------------------------------------------

    /// Shared key between the local identity and `their_pub_b64`.
    pub fn derive_shared_key(&self, their_pub_b64: &str) -> CryptoResult<SharedKey> {
        let their_public = PublicKey::from_b64(their_pub_b64)?;
        let me = self.get_or_create_my_keypair()?;
        agreement::derive_shared_key(&me.secret, &their_public)
    }

    // ---- text -----------------------------------------------------------

    /// Encrypt a text message to a base64 public key.
    #[instrument(
        skip_all,
        fields(subsystem = "crypto", component = "messenger", op = "encrypt_text")
    )]
    pub fn encrypt_text_for(
        &self,
        their_pub_b64: &str,
        plaintext: &str,
    ) -> CryptoResult<EncryptedTextEnvelope> {
        let their_public = PublicKey::from_b64(their_pub_b64)?;
        self.encrypt_text_to(&their_public, plaintext)
    }

    /// Encrypt a text message to a peer from the registry.
    #[instrument(
        skip_all,
        fields(subsystem = "crypto", component = "messenger", op = "encrypt_text")
    )]
    pub fn encrypt_text_for_peer(
        &self,
        peer_id: &str,
        plaintext: &str,
    ) -> CryptoResult<EncryptedTextEnvelope> {
        let their_public = self.peer_public_key(peer_id)?;
        self.encrypt_text_to(&their_public, plaintext)
    }

    fn encrypt_text_to(
        &self,
        their_public: &PublicKey,
        plaintext: &str,
    ) -> CryptoResult<EncryptedTextEnvelope> {
        let start = Instant::now();
        let me = self.get_or_create_my_keypair()?;
        let envelope = text::encrypt_text(&me, their_public, plaintext)?;

        debug!(
            input_len = plaintext.len(),
            output_len = envelope.ct_b64.len(),
            duration_us = start.elapsed().as_micros() as u64,
            "Text encrypted"
        );
        Ok(envelope)
    }

    /// Decrypt a text envelope with `keypair`, or the local identity if `None`.
    #[instrument(
        skip_all,
        fields(subsystem = "crypto", component = "messenger", op = "decrypt_text")
    )]
    pub fn decrypt_text_payload(
        &self,
        envelope: &EncryptedTextEnvelope,
        keypair: Option<&KeyPair>,
    ) -> CryptoResult<String> {
        let start = Instant::now();
        let result = match keypair {
            Some(keypair) => text::decrypt_text(envelope, keypair),
            None => text::decrypt_text(envelope, &self.get_or_create_my_keypair()?),
        };

        match &result {
            Ok(plaintext) => debug!(
                output_len = plaintext.len(),
                duration_us = start.elapsed().as_micros() as u64,
                "Text decrypted"
            ),
            Err(e) => warn!(error = %e, "Text decryption failed"),
        }
        result
    }

    /// Parse a JSON text envelope and decrypt it.
    pub fn decrypt_text_json(&self, json: &str, keypair: Option<&KeyPair>) -> CryptoResult<String> {
        let envelope = EncryptedTextEnvelope::from_json(json)?;
        self.decrypt_text_payload(&envelope, keypair)
    }

    /// Read back a message we sent to `peer_id`.
    pub fn decrypt_sent_text(
        &self,
        envelope: &EncryptedTextEnvelope,
        peer_id: &str,
    ) -> CryptoResult<String> {
        let peer = self.peer_public_key(peer_id)?;
        let me = self.get_or_create_my_keypair()?;
        text::decrypt_text_with_peer(envelope, &me, &peer)
    }

    // ---- files ----------------------------------------------------------

    /// Encrypt a file to a base64 public key.
    #[instrument(
        skip_all,
        fields(subsystem = "crypto", component = "messenger", op = "encrypt_file")
    )]
    pub fn encrypt_file_for(
        &self,
        their_pub_b64: &str,
        file: &PlainFile,
    ) -> CryptoResult<EncryptedFile> {
        let their_public = PublicKey::from_b64(their_pub_b64)?;
        self.encrypt_file_to(&their_public, file)
    }

    /// Encrypt a file to a peer from the registry.
    #[instrument(
        skip_all,
        fields(subsystem = "crypto", component = "messenger", op = "encrypt_file")
    )]
    pub fn encrypt_file_for_peer(
        &self,
        peer_id: &str,
        file: &PlainFile,
    ) -> CryptoResult<EncryptedFile> {
        let their_public = self.peer_public_key(peer_id)?;
        self.encrypt_file_to(&their_public, file)
    }

    fn encrypt_file_to(
        &self,
        their_public: &PublicKey,
        plain: &PlainFile,
    ) -> CryptoResult<EncryptedFile> {
        let start = Instant::now();
        let me = self.get_or_create_my_keypair()?;
        let encrypted = file::encrypt_file(&me, their_public, plain)?;

        debug!(
            input_len = plain.bytes.len(),
            output_len = encrypted.ciphertext.len(),
            mime_type = %plain.mime_type,
            duration_us = start.elapsed().as_micros() as u64,
            "File encrypted"
        );
        Ok(encrypted)
    }

    /// Decrypt a file blob addressed to the local identity.
    #[instrument(
        skip_all,
        fields(subsystem = "crypto", component = "messenger", op = "decrypt_file")
    )]
    pub fn decrypt_file_blob(
        &self,
        metadata: &EncryptedFileMetadata,
        cipher_bytes: &[u8],
    ) -> CryptoResult<DecryptedFile> {
        let start = Instant::now();
        let me = self.get_or_create_my_keypair()?;
        let result = file::decrypt_file(metadata, cipher_bytes, &me);

        match &result {
            Ok(decrypted) => debug!(
                input_len = cipher_bytes.len(),
                output_len = decrypted.bytes.len(),
                duration_us = start.elapsed().as_micros() as u64,
                "File decrypted"
            ),
            Err(e) => warn!(error = %e, "File decryption failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_messenger_is_send_sync() {
        assert_send_sync::<Messenger>();
    }

    #[test]
    fn test_text_between_messengers() {
        let alice = Messenger::in_memory();
        let bob = Messenger::in_memory();

        let env = alice
            .encrypt_text_for(&bob.my_public_key_b64().unwrap(), "gm fren")
            .unwrap();
        assert_eq!(bob.decrypt_text_payload(&env, None).unwrap(), "gm fren");
    }

    #[test]
    fn test_scope_case_shares_identity_and_peers() {
        let store: Arc<dyn KeyStore> = Arc::new(MemoryKeyStore::new());
        let bob = Messenger::in_memory();

        let checksummed = Messenger::with_scope(store.clone(), Some("0xAbC"));
        checksummed
            .set_friend_messaging_key_b64("0xb0b", &bob.my_public_key_b64().unwrap())
            .unwrap();
        let env = checksummed.encrypt_text_for_peer("0xb0b", "gm").unwrap();

        let lower = Messenger::with_scope(store, Some("0xabc"));
        assert_eq!(
            lower.my_public_key_b64().unwrap(),
            checksummed.my_public_key_b64().unwrap()
        );
        assert!(lower.friend_messaging_key_b64("0xb0b").unwrap().is_some());
        assert_eq!(bob.decrypt_text_payload(&env, None).unwrap(), "gm");
    }

    #[test]
    fn test_encrypt_for_unknown_peer() {
        let alice = Messenger::in_memory();
        match alice.encrypt_text_for_peer(" 0xBob ", "hi") {
            Err(CryptoError::UnknownPeer(peer)) => assert_eq!(peer, "0xbob"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_encrypt_for_peer_and_read_back() {
        let alice = Messenger::in_memory();
        let bob = Messenger::in_memory();
        alice
            .set_friend_messaging_key_b64("bob", &bob.my_public_key_b64().unwrap())
            .unwrap();

        let env = alice.encrypt_text_for_peer("bob", "hello bob").unwrap();
        assert_eq!(bob.decrypt_text_payload(&env, None).unwrap(), "hello bob");
        assert_eq!(alice.decrypt_sent_text(&env, "bob").unwrap(), "hello bob");
    }

    #[test]
    fn test_decrypt_with_explicit_keypair() {
        let alice = Messenger::in_memory();
        let bob = Messenger::in_memory();
        let bob_keys = bob.get_or_create_my_keypair().unwrap();

        let env = alice
            .encrypt_text_for(&bob_keys.public.to_b64(), "explicit")
            .unwrap();
        let carol = Messenger::in_memory();
        assert_eq!(
            carol.decrypt_text_payload(&env, Some(&bob_keys)).unwrap(),
            "explicit"
        );
    }

    #[test]
    fn test_decrypt_text_json_malformed() {
        let bob = Messenger::in_memory();
        assert!(matches!(
            bob.decrypt_text_json("{\"v\":1}", None),
            Err(CryptoError::Encoding(_))
        ));
    }

    #[test]
    fn test_derive_shared_key_symmetry() {
        let alice = Messenger::in_memory();
        let bob = Messenger::in_memory();

        let ab = alice
            .derive_shared_key(&bob.my_public_key_b64().unwrap())
            .unwrap();
        let ba = bob
            .derive_shared_key(&alice.my_public_key_b64().unwrap())
            .unwrap();
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn test_derive_shared_key_malformed() {
        let alice = Messenger::in_memory();
        assert!(matches!(
            alice.derive_shared_key("not-base64!!"),
            Err(CryptoError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_file_between_messengers() {
        let alice = Messenger::in_memory();
        let bob = Messenger::in_memory();
        let plain = PlainFile::new("notes.txt", "text/plain", b"line one\nline two".to_vec());

        let enc = alice
            .encrypt_file_for(&bob.my_public_key_b64().unwrap(), &plain)
            .unwrap();
        let dec = bob.decrypt_file_blob(&enc.metadata, &enc.ciphertext).unwrap();
        assert_eq!(dec.bytes, plain.bytes);
        assert_eq!(dec.name, "notes.txt");
        assert_eq!(dec.mime_type, "text/plain");
    }

    #[test]
    fn test_fingerprint_matches_public_key() {
        let alice = Messenger::in_memory();
        let public = PublicKey::from_b64(&alice.my_public_key_b64().unwrap()).unwrap();
        assert!(alice.my_fingerprint().unwrap().matches(&public));
    }
}
