//! XSalsa20-Poly1305 cipher operations.
//!
//! This is the NaCl `secretbox` construction used after the `box`
//! precomputation: the 32-byte key comes from [`crate::agreement`].

use rand::RngCore;
use xsalsa20poly1305::{
    aead::{Aead, KeyInit},
    Nonce, XSalsa20Poly1305,
};

use crate::error::{CryptoError, CryptoResult};
use crate::format::{KEY_LEN, NONCE_LEN};

/// Generate cryptographically secure random bytes.
pub fn generate_random<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Generate a random nonce (24 bytes).
///
/// 192-bit random nonces make collisions negligible, so no counter state is
/// needed per shared key.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    generate_random()
}

/// Encrypt plaintext with XSalsa20-Poly1305.
///
/// Returns the ciphertext with the 16-byte authentication tag.
pub fn seal(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = XSalsa20Poly1305::new(key.into());

    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::Encryption("XSalsa20-Poly1305 encryption failed".into()))
}

/// Decrypt and authenticate ciphertext with XSalsa20-Poly1305.
///
/// Any authentication failure (wrong key, wrong nonce, modified or
/// truncated ciphertext) is reported as [`CryptoError::DecryptionFailed`].
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = XSalsa20Poly1305::new(key.into());

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::TAG_LEN;

    #[test]
    fn test_generate_nonce() {
        let nonce1 = generate_nonce();
        let nonce2 = generate_nonce();

        assert_eq!(nonce1.len(), 24);
        assert_ne!(nonce1, nonce2); // Should be random
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let key = [42u8; 32];
        let nonce = [1u8; 24];
        let plaintext = b"Hello, World!";

        let ciphertext = seal(&key, &nonce, plaintext).unwrap();
        let decrypted = open(&key, &nonce, &ciphertext).unwrap();

        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_ciphertext_carries_tag() {
        let key = [42u8; 32];
        let nonce = [1u8; 24];
        let plaintext = b"Hello, World!";

        let ciphertext = seal(&key, &nonce, plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_LEN);
    }

    #[test]
    fn test_open_wrong_key() {
        let nonce = [1u8; 24];
        let ciphertext = seal(&[42u8; 32], &nonce, b"Secret data").unwrap();

        let result = open(&[99u8; 32], &nonce, &ciphertext);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_open_wrong_nonce() {
        let key = [42u8; 32];
        let ciphertext = seal(&key, &[1u8; 24], b"Secret data").unwrap();

        let result = open(&key, &[2u8; 24], &ciphertext);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_open_tampered_ciphertext() {
        let key = [42u8; 32];
        let nonce = [1u8; 24];
        let mut ciphertext = seal(&key, &nonce, b"Secret data").unwrap();

        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;

        let result = open(&key, &nonce, &ciphertext);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_open_truncated_ciphertext() {
        let key = [42u8; 32];
        let nonce = [1u8; 24];

        let result = open(&key, &nonce, &[0u8; 10]);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_seal_empty_plaintext() {
        let key = [42u8; 32];
        let nonce = [1u8; 24];

        let ciphertext = seal(&key, &nonce, b"").unwrap();
        assert_eq!(ciphertext.len(), TAG_LEN);
        assert!(open(&key, &nonce, &ciphertext).unwrap().is_empty());
    }
}
