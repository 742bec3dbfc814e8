//! Durable key storage.
//!
//! Identity records and peer keys are plain strings under string slots. The
//! [`KeyStore`] trait is the only thing the identity manager and peer
//! registry depend on, so a platform keychain or a browser-backed store can
//! be slotted in without touching the cipher code.
//!
//! Shipped implementations:
//! - [`MemoryKeyStore`] for tests and throwaway sessions
//! - [`FileKeyStore`] for a JSON document on disk, optionally sealed with a
//!   passphrase (see [`sealed`])

mod file;
mod memory;
pub mod sealed;

pub use file::FileKeyStore;
pub use memory::MemoryKeyStore;

use chainchat_core::config::normalize_scope;

use crate::error::CryptoResult;

/// String-keyed durable storage for key material.
///
/// Every method fails with [`CryptoError::StorageUnavailable`] when the
/// backing store cannot be read or written.
///
/// [`CryptoError::StorageUnavailable`]: crate::CryptoError::StorageUnavailable
pub trait KeyStore: Send + Sync {
    /// Read a slot. Absence is `Ok(None)`, never an error.
    fn get(&self, key: &str) -> CryptoResult<Option<String>>;

    /// Write a slot, overwriting any previous value.
    fn set(&self, key: &str, value: &str) -> CryptoResult<()>;

    /// Remove a slot. Removing an absent slot succeeds.
    fn delete(&self, key: &str) -> CryptoResult<()>;

    /// Write a slot only if it is empty.
    ///
    /// Returns `None` when `value` was stored, or the existing value when the
    /// slot was already occupied (in which case nothing changes).
    fn set_if_absent(&self, key: &str, value: &str) -> CryptoResult<Option<String>>;
}

/// Build the storage slot for `key`, namespaced by an optional identity scope.
///
/// The scope is trimmed and lower-cased; a blank scope is the unscoped
/// namespace.
///
/// ```
/// use chainchat_crypto::keystore::scoped_key;
///
/// assert_eq!(scoped_key(None, "messaging_keypair_v1"), "messaging_keypair_v1");
/// assert_eq!(
///     scoped_key(Some("0xabc"), "messaging_keypair_v1"),
///     "0xabc/messaging_keypair_v1"
/// );
/// assert_eq!(
///     scoped_key(Some(" 0xAbC "), "messaging_keypair_v1"),
///     "0xabc/messaging_keypair_v1"
/// );
/// ```
pub fn scoped_key(scope: Option<&str>, key: &str) -> String {
    match scope.and_then(normalize_scope) {
        Some(scope) => format!("{}/{}", scope, key),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_key_without_scope() {
        assert_eq!(scoped_key(None, "slot"), "slot");
    }

    #[test]
    fn test_scoped_key_with_scope() {
        assert_eq!(scoped_key(Some("alice"), "slot"), "alice/slot");
    }

    #[test]
    fn test_scoped_key_normalizes_scope() {
        assert_eq!(scoped_key(Some("0xAbC"), "slot"), "0xabc/slot");
        assert_eq!(scoped_key(Some("  "), "slot"), "slot");
    }
}
