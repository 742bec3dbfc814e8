//! Peer key registry.
//!
//! Maps peer identifiers to their base64 messaging public keys. Keys arrive
//! out-of-band (pasted, scanned, fetched) and are stored as given; they are
//! only decoded when used.

use std::sync::Arc;

use chainchat_core::config::normalize_scope;
use tracing::debug;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::PublicKey;
use crate::keystore::{scoped_key, KeyStore};

/// Storage slot prefix for peer keys.
pub const PEER_SLOT_PREFIX: &str = "friend_msg_key:";

/// Normalize a peer identifier: trimmed and lower-cased.
///
/// Wallet addresses arrive in mixed case (checksummed or not); every form
/// must land on the same slot.
pub fn normalize_peer_id(peer_id: &str) -> CryptoResult<String> {
    let normalized = peer_id.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(CryptoError::InvalidInput(
            "Peer identifier is empty".to_string(),
        ));
    }
    Ok(normalized)
}

/// Per-identity store of peer public keys.
pub struct PeerKeyRegistry {
    store: Arc<dyn KeyStore>,
    scope: Option<String>,
}

impl PeerKeyRegistry {
    /// Registry over the unscoped namespace of `store`.
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self::with_scope(store, None)
    }

    /// Registry for one local account.
    pub fn with_scope(store: Arc<dyn KeyStore>, scope: Option<&str>) -> Self {
        Self {
            store,
            scope: scope.and_then(normalize_scope),
        }
    }

    fn slot(&self, peer_id: &str) -> CryptoResult<String> {
        let peer = normalize_peer_id(peer_id)?;
        Ok(self.slot_for(&peer))
    }

    fn slot_for(&self, normalized: &str) -> String {
        scoped_key(
            self.scope.as_deref(),
            &format!("{}{}", PEER_SLOT_PREFIX, normalized),
        )
    }

    /// The stored base64 key for a peer, or `None` if none was imported.
    pub fn friend_key_b64(&self, peer_id: &str) -> CryptoResult<Option<String>> {
        self.store.get(&self.slot(peer_id)?)
    }

    /// Store or overwrite a peer's key. The value is not validated.
    pub fn set_friend_key_b64(&self, peer_id: &str, pub_b64: &str) -> CryptoResult<()> {
        let peer = normalize_peer_id(peer_id)?;
        self.store.set(&self.slot_for(&peer), pub_b64)?;
        debug!(
            subsystem = "crypto",
            component = "registry",
            op = "set",
            peer_id = %peer,
            "Peer key stored"
        );
        Ok(())
    }

    /// Forget a peer's key. Forgetting an unknown peer succeeds.
    pub fn remove_friend_key(&self, peer_id: &str) -> CryptoResult<()> {
        self.store.delete(&self.slot(peer_id)?)
    }

    /// The decoded key for a peer.
    ///
    /// Fails with [`CryptoError::MalformedKey`] when the stored value is not
    /// a 32-byte base64 key.
    pub fn friend_public_key(&self, peer_id: &str) -> CryptoResult<Option<PublicKey>> {
        self.friend_key_b64(peer_id)?
            .map(|encoded| PublicKey::from_b64(&encoded))
            .transpose()
    }
}

impl std::fmt::Debug for PeerKeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerKeyRegistry")
            .field("scope", &self.scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;
    use crate::keystore::MemoryKeyStore;

    fn registry() -> PeerKeyRegistry {
        PeerKeyRegistry::new(Arc::new(MemoryKeyStore::new()))
    }

    #[test]
    fn test_unknown_peer_is_none() {
        assert_eq!(registry().friend_key_b64("0xabc").unwrap(), None);
    }

    #[test]
    fn test_set_and_overwrite() {
        let reg = registry();
        reg.set_friend_key_b64("0xabc", "first").unwrap();
        reg.set_friend_key_b64("0xabc", "second").unwrap();
        assert_eq!(
            reg.friend_key_b64("0xabc").unwrap().as_deref(),
            Some("second")
        );
    }

    #[test]
    fn test_peer_id_normalization() {
        let reg = registry();
        reg.set_friend_key_b64("  0xAbCdEf ", "key").unwrap();
        assert_eq!(
            reg.friend_key_b64("0xabcdef").unwrap().as_deref(),
            Some("key")
        );
        assert_eq!(
            reg.friend_key_b64("0XABCDEF").unwrap().as_deref(),
            Some("key")
        );
    }

    #[test]
    fn test_empty_peer_id_rejected() {
        let reg = registry();
        assert!(matches!(
            reg.set_friend_key_b64("   ", "key"),
            Err(CryptoError::InvalidInput(_))
        ));
        assert!(matches!(
            reg.friend_key_b64(""),
            Err(CryptoError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_remove() {
        let reg = registry();
        reg.set_friend_key_b64("bob", "key").unwrap();
        reg.remove_friend_key("bob").unwrap();
        reg.remove_friend_key("bob").unwrap();
        assert_eq!(reg.friend_key_b64("bob").unwrap(), None);
    }

    #[test]
    fn test_friend_public_key_decodes() {
        let reg = registry();
        let bob = KeyPair::generate();
        reg.set_friend_key_b64("bob", &bob.public.to_b64()).unwrap();
        assert_eq!(reg.friend_public_key("bob").unwrap(), Some(bob.public));
        assert_eq!(reg.friend_public_key("carol").unwrap(), None);
    }

    #[test]
    fn test_friend_public_key_malformed() {
        let reg = registry();
        reg.set_friend_key_b64("bob", "not-base64!!").unwrap();
        assert!(matches!(
            reg.friend_public_key("bob"),
            Err(CryptoError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_slot_layout() {
        let store: Arc<dyn KeyStore> = Arc::new(MemoryKeyStore::new());
        let reg = PeerKeyRegistry::with_scope(store.clone(), Some("0xme"));
        reg.set_friend_key_b64("0xFriend", "key").unwrap();
        assert_eq!(
            store.get("0xme/friend_msg_key:0xfriend").unwrap().as_deref(),
            Some("key")
        );
    }

    #[test]
    fn test_scope_is_case_insensitive() {
        let store: Arc<dyn KeyStore> = Arc::new(MemoryKeyStore::new());
        PeerKeyRegistry::with_scope(store.clone(), Some("0xMe"))
            .set_friend_key_b64("0xfriend", "key")
            .unwrap();

        let reg = PeerKeyRegistry::with_scope(store, Some("0xme"));
        assert_eq!(
            reg.friend_key_b64("0xfriend").unwrap().as_deref(),
            Some("key")
        );
    }
}
