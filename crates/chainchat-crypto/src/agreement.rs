//! X25519 key agreement.
//!
//! Both parties derive the same 32-byte symmetric key from their own secret
//! key and the other side's public key:
//!
//! ```text
//! dh         = X25519(our_secret, their_public)
//! shared_key = HSalsa20(dh, [0u8; 16])
//! ```
//!
//! This is the NaCl `box.before` precomputation, so the resulting key opens
//! anything sealed by `crypto_box`/libsodium `box` between the same two keys.

use salsa20::cipher::consts::U10;
use salsa20::cipher::generic_array::GenericArray;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};
use crate::format::KEY_LEN;
use crate::keys::{PublicKey, SecretKey};

/// Symmetric key shared by two parties.
///
/// Recomputed per operation and never persisted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; KEY_LEN]);

impl SharedKey {
    /// Get the raw bytes of the shared key.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive the shared key between our secret key and their public key.
///
/// The result is the same whether computed as:
/// - derive(our_secret, their_public)
/// - derive(their_secret, our_public)
///
/// Fails with [`CryptoError::MalformedKey`] when `their_public` is a
/// low-order point, since every such key yields the same all-zero output.
pub fn derive_shared_key(
    our_secret: &SecretKey,
    their_public: &PublicKey,
) -> CryptoResult<SharedKey> {
    let secret = our_secret.to_x25519();
    let dh = secret.diffie_hellman(&their_public.to_x25519());

    if !dh.was_contributory() {
        return Err(CryptoError::MalformedKey(
            "Public key is a low-order point".to_string(),
        ));
    }

    let mut derived = salsa20::hsalsa::<U10>(dh.as_bytes().into(), &GenericArray::default());

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(derived.as_slice());
    derived.as_mut_slice().zeroize();

    Ok(SharedKey(key))
}
