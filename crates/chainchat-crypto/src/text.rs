//! Text message encryption.
//!
//! Stateless: every call derives the shared key, draws a fresh nonce, and
//! drops the key before returning.

use crate::agreement::derive_shared_key;
use crate::cipher::{generate_nonce, open, seal};
use crate::envelope::{CipherSuite, EncryptedTextEnvelope};
use crate::error::{CryptoError, CryptoResult};
use crate::format::base64_encode;
use crate::keys::{KeyPair, PublicKey};

/// Encrypt `plaintext` from `sender` to `recipient`.
pub fn encrypt_text(
    sender: &KeyPair,
    recipient: &PublicKey,
    plaintext: &str,
) -> CryptoResult<EncryptedTextEnvelope> {
    let suite = CipherSuite::CURRENT;
    let shared = derive_shared_key(&sender.secret, recipient)?;
    let nonce = generate_nonce();
    let ciphertext = seal(shared.as_bytes(), &nonce, plaintext.as_bytes())?;

    Ok(EncryptedTextEnvelope {
        v: suite.version(),
        alg: suite.alg().to_string(),
        sender_pub_b64: sender.public.to_b64(),
        nonce_b64: base64_encode(&nonce),
        ct_b64: base64_encode(&ciphertext),
    })
}

/// Decrypt an envelope addressed to `recipient`.
///
/// The counterparty key is the envelope's `senderPub_b64`, decoded only once
/// the suite is known.
pub fn decrypt_text(
    envelope: &EncryptedTextEnvelope,
    recipient: &KeyPair,
) -> CryptoResult<String> {
    let sender = match envelope.suite()? {
        CipherSuite::X25519XSalsa20Poly1305 => envelope.sender_public()?,
    };
    decrypt_text_with_peer(envelope, recipient, &sender)
}

/// Decrypt an envelope using an explicit counterparty key.
///
/// Needed to read back one's own outgoing messages: the envelope names the
/// sender (us), so the peer's key has to come from the registry instead.
pub fn decrypt_text_with_peer(
    envelope: &EncryptedTextEnvelope,
    own: &KeyPair,
    peer: &PublicKey,
) -> CryptoResult<String> {
    let plaintext = match envelope.suite()? {
        CipherSuite::X25519XSalsa20Poly1305 => {
            let nonce = envelope.nonce()?;
            let ciphertext = envelope.ciphertext()?;
            let shared = derive_shared_key(&own.secret, peer)?;
            open(shared.as_bytes(), &nonce, &ciphertext)?
        }
    };

    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::Encoding("Decrypted text is not valid UTF-8".to_string()))
}
