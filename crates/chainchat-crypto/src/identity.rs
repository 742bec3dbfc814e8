//! Identity key manager.
//!
//! Owns the local messaging keypair: created lazily on first use, persisted
//! in the key store, and returned unchanged on every later call.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::error::{CryptoError, CryptoResult};
use crate::fingerprint::KeyFingerprint;
use crate::keys::{IdentityRecord, KeyPair};
use crate::keystore::{scoped_key, KeyStore};

/// Storage slot for the identity record.
pub const IDENTITY_SLOT: &str = "messaging_keypair_v1";

/// Creates and loads the durable X25519 identity.
pub struct IdentityKeyManager {
    store: Arc<dyn KeyStore>,
    slot: String,
    create_lock: Mutex<()>,
}

impl IdentityKeyManager {
    /// Manage the unscoped identity in `store`.
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self::with_scope(store, None)
    }

    /// Manage the identity for one local account, e.g. a wallet address.
    pub fn with_scope(store: Arc<dyn KeyStore>, scope: Option<&str>) -> Self {
        Self {
            store,
            slot: scoped_key(scope, IDENTITY_SLOT),
            create_lock: Mutex::new(()),
        }
    }

    /// Return the stored keypair, generating and persisting one if absent.
    ///
    /// A stored record that cannot be decoded is reported as
    /// [`CryptoError::MalformedKey`] and left in place; replacing it would
    /// orphan every message encrypted to the old key.
    pub fn get_or_create_keypair(&self) -> CryptoResult<KeyPair> {
        if let Some(keypair) = self.load()? {
            return Ok(keypair);
        }

        let _guard = self
            .create_lock
            .lock()
            .map_err(|_| CryptoError::StorageUnavailable("Identity lock poisoned".to_string()))?;

        // Another caller may have created it while we waited.
        if let Some(keypair) = self.load()? {
            return Ok(keypair);
        }

        let keypair = KeyPair::generate();
        let record = IdentityRecord::from_keypair(&keypair).to_json()?;

        match self.store.set_if_absent(&self.slot, &record)? {
            None => {
                info!(
                    subsystem = "crypto",
                    component = "identity",
                    op = "create",
                    fingerprint = %KeyFingerprint::from_public_key(&keypair.public),
                    "Messaging identity created"
                );
                Ok(keypair)
            }
            // Created by another handle or process between our load and write.
            Some(existing) => IdentityRecord::from_json(&existing)?.to_keypair(),
        }
    }

    /// Base64 public key for display and sharing.
    pub fn public_key_b64(&self) -> CryptoResult<String> {
        Ok(self.get_or_create_keypair()?.public.to_b64())
    }

    /// Load the stored keypair without creating one.
    pub fn load(&self) -> CryptoResult<Option<KeyPair>> {
        let Some(json) = self.store.get(&self.slot)? else {
            return Ok(None);
        };

        let keypair = IdentityRecord::from_json(&json)?.to_keypair()?;
        debug!(
            subsystem = "crypto",
            component = "identity",
            op = "load",
            fingerprint = %KeyFingerprint::from_public_key(&keypair.public),
            "Messaging identity loaded"
        );
        Ok(Some(keypair))
    }
}

impl std::fmt::Debug for IdentityKeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeyManager")
            .field("slot", &self.slot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeyStore;

    #[test]
    fn test_creates_once() {
        let store = Arc::new(MemoryKeyStore::new());
        let manager = IdentityKeyManager::new(store.clone());

        let first = manager.get_or_create_keypair().unwrap();
        let second = manager.get_or_create_keypair().unwrap();

        assert_eq!(first.public, second.public);
        assert_eq!(first.secret.as_bytes(), second.secret.as_bytes());
        assert!(store.get(IDENTITY_SLOT).unwrap().is_some());
    }

    #[test]
    fn test_new_manager_same_store_same_identity() {
        let store: Arc<dyn KeyStore> = Arc::new(MemoryKeyStore::new());
        let a = IdentityKeyManager::new(store.clone())
            .get_or_create_keypair()
            .unwrap();
        let b = IdentityKeyManager::new(store)
            .get_or_create_keypair()
            .unwrap();
        assert_eq!(a.public, b.public);
    }

    #[test]
    fn test_scopes_are_independent() {
        let store: Arc<dyn KeyStore> = Arc::new(MemoryKeyStore::new());
        let alice = IdentityKeyManager::with_scope(store.clone(), Some("alice"));
        let bob = IdentityKeyManager::with_scope(store.clone(), Some("bob"));

        let a = alice.get_or_create_keypair().unwrap();
        let b = bob.get_or_create_keypair().unwrap();
        assert_ne!(a.public, b.public);
        assert!(store.get("alice/messaging_keypair_v1").unwrap().is_some());
    }

    #[test]
    fn test_scope_is_case_insensitive() {
        let store: Arc<dyn KeyStore> = Arc::new(MemoryKeyStore::new());
        let mixed = IdentityKeyManager::with_scope(store.clone(), Some("0xAbC"))
            .get_or_create_keypair()
            .unwrap();
        let lower = IdentityKeyManager::with_scope(store.clone(), Some(" 0xabc "))
            .get_or_create_keypair()
            .unwrap();

        assert_eq!(mixed.public, lower.public);
        assert!(store.get("0xabc/messaging_keypair_v1").unwrap().is_some());
        assert!(store.get("0xAbC/messaging_keypair_v1").unwrap().is_none());
    }

    #[test]
    fn test_public_key_b64_matches_keypair() {
        let manager = IdentityKeyManager::new(Arc::new(MemoryKeyStore::new()));
        let keypair = manager.get_or_create_keypair().unwrap();
        assert_eq!(manager.public_key_b64().unwrap(), keypair.public.to_b64());
    }

    #[test]
    fn test_load_without_identity() {
        let manager = IdentityKeyManager::new(Arc::new(MemoryKeyStore::new()));
        assert!(manager.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_record_is_not_replaced() {
        let store = Arc::new(MemoryKeyStore::new());
        let corrupt = r#"{"publicKey_b64":"AAAA","secretKey_b64":"AAAA"}"#;
        store.set(IDENTITY_SLOT, corrupt).unwrap();
        let manager = IdentityKeyManager::new(store.clone());

        let result = manager.get_or_create_keypair();
        assert!(matches!(result, Err(CryptoError::MalformedKey(_))));
        assert_eq!(store.get(IDENTITY_SLOT).unwrap().as_deref(), Some(corrupt));
    }
}
