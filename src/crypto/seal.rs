//! Sealed messages between participants
//!
//! Combines an ephemeral secp256k1 key exchange with ChaCha20-Poly1305
//! authenticated encryption so that anyone can address a confidential
//! payload to a recipient's public key.
//!
//! Sealed payload layout, fixed for interoperability:
//!
//! ```text
//! ephemeral public key (33, compressed) || nonce (12) || ciphertext + tag (len + 16)
//! ```
//!
//! The ephemeral public key is bound as associated data, so a sealed
//! payload whose key prefix was tampered with fails authentication.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use super::keys::{PrivateKey, PublicKey};

/// Length of the compressed ephemeral public key prefix
pub const EPHEMERAL_KEY_LEN: usize = 33;

/// Length of the ChaCha20-Poly1305 nonce
pub const NONCE_LEN: usize = 12;

/// Length of the Poly1305 authentication tag
pub const TAG_LEN: usize = 16;

/// Errors that can occur while sealing or opening a payload
#[derive(Error, Debug)]
pub enum SealError {
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("decryption failed: {0}")]
    Decryption(String),
    #[error("sealed payload truncated: {0} bytes")]
    Truncated(usize),
    #[error("invalid ephemeral public key")]
    InvalidEphemeralKey,
}

/// Seal `payload` for the holder of `recipient`'s private key.
///
/// A fresh ephemeral key pair is generated per call and discarded once the
/// shared secret has been derived; only its public half leaves this
/// function, embedded in the sealed payload. Key agreement yields the
/// 256-bit AEAD key directly.
pub fn seal(recipient: &PublicKey, payload: &[u8]) -> Result<Vec<u8>, SealError> {
    let ephemeral = PrivateKey::generate();
    let ephemeral_public = ephemeral.public_key().format(true);
    let key = ephemeral.ecdh(recipient);

    let cipher = ChaCha20Poly1305::new_from_slice(&key)
        .map_err(|e| SealError::Encryption(e.to_string()))?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: payload,
                aad: &ephemeral_public,
            },
        )
        .map_err(|e| SealError::Encryption(e.to_string()))?;

    let mut sealed = Vec::with_capacity(EPHEMERAL_KEY_LEN + NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&ephemeral_public);
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);

    log::debug!(
        "sealed {} plaintext bytes into {} sealed bytes",
        payload.len(),
        sealed.len()
    );
    Ok(sealed)
}

/// Open a sealed payload addressed to `recipient_key`.
///
/// Recomputes the shared secret from the embedded ephemeral public key and
/// authenticates both the ciphertext and the key prefix before returning
/// the plaintext. Any other private key fails authentication rather than
/// producing garbage output.
pub fn open(recipient_key: &PrivateKey, sealed: &[u8]) -> Result<Vec<u8>, SealError> {
    if sealed.len() < EPHEMERAL_KEY_LEN + NONCE_LEN + TAG_LEN {
        return Err(SealError::Truncated(sealed.len()));
    }

    let (ephemeral_bytes, rest) = sealed.split_at(EPHEMERAL_KEY_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let ephemeral_public =
        PublicKey::from_bytes(ephemeral_bytes).map_err(|_| SealError::InvalidEphemeralKey)?;
    let key = recipient_key.ecdh(&ephemeral_public);

    let cipher = ChaCha20Poly1305::new_from_slice(&key)
        .map_err(|e| SealError::Decryption(e.to_string()))?;

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: ephemeral_bytes,
            },
        )
        .map_err(|_| SealError::Decryption("authentication failed".to_string()))
}
