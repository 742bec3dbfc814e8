//! In-memory key store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::KeyStore;
use crate::error::{CryptoError, CryptoResult};

/// Key store held entirely in memory. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> CryptoResult<usize> {
        Ok(self.read()?.len())
    }

    /// Whether the store has no slots.
    pub fn is_empty(&self) -> CryptoResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> CryptoResult<RwLockReadGuard<'_, HashMap<String, String>>> {
        self.entries
            .read()
            .map_err(|_| CryptoError::StorageUnavailable("Memory store lock poisoned".to_string()))
    }

    fn write(&self) -> CryptoResult<RwLockWriteGuard<'_, HashMap<String, String>>> {
        self.entries
            .write()
            .map_err(|_| CryptoError::StorageUnavailable("Memory store lock poisoned".to_string()))
    }
}

impl KeyStore for MemoryKeyStore {
    fn get(&self, key: &str) -> CryptoResult<Option<String>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CryptoResult<()> {
        self.write()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> CryptoResult<()> {
        self.write()?.remove(key);
        Ok(())
    }

    fn set_if_absent(&self, key: &str, value: &str) -> CryptoResult<Option<String>> {
        let mut entries = self.write()?;
        if let Some(existing) = entries.get(key) {
            return Ok(Some(existing.clone()));
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_is_none() {
        let store = MemoryKeyStore::new();
        assert_eq!(store.get("nothing").unwrap(), None);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_set_get_overwrite() {
        let store = MemoryKeyStore::new();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = MemoryKeyStore::new();
        store.set("k", "v").unwrap();
        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_set_if_absent() {
        let store = MemoryKeyStore::new();
        assert_eq!(store.set_if_absent("k", "first").unwrap(), None);
        assert_eq!(
            store.set_if_absent("k", "second").unwrap().as_deref(),
            Some("first")
        );
        assert_eq!(store.get("k").unwrap().as_deref(), Some("first"));
    }

    #[test]
    fn test_poisoned_lock_is_unavailable() {
        let store = std::sync::Arc::new(MemoryKeyStore::new());
        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(matches!(store.len(), Err(CryptoError::StorageUnavailable(_))));
        assert!(matches!(store.get("k"), Err(CryptoError::StorageUnavailable(_))));
    }
}
