//! Key material for the blockchain trust layer
//!
//! Provides secp256k1 public and private keys, ECDSA signature
//! verification, Diffie-Hellman key agreement, and address derivation.

use rand::rngs::OsRng;
use ripemd::{Digest, Ripemd160};
use secp256k1::ecdh::SharedSecret;
use secp256k1::{ecdsa, Message, Secp256k1, SecretKey};
use thiserror::Error;

use super::hash::{double_sha256, sha256};
use super::seal::{self, SealError};

/// The signature algorithm understood by [`PublicKey::verify_with`].
pub const SHA256_WITH_ECDSA: &str = "SHA256withECDSA";

/// Version byte prepended to address payloads before Base58Check encoding
const ADDRESS_VERSION: u8 = 0x00;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("invalid public key encoding")]
    InvalidPublicKey,
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A point on the secp256k1 curve identifying a participant.
///
/// Equality, ordering, and hashing are defined over the key material
/// itself, so two keys decoded from the compressed and uncompressed
/// encodings of the same point compare equal. Instances are immutable and
/// freely shareable across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey {
    point: secp256k1::PublicKey,
}

impl PublicKey {
    /// Decode a public key from its SEC1 encoding.
    ///
    /// Accepts the compressed (33 bytes, leading `0x02`/`0x03`) and
    /// uncompressed (65 bytes, leading `0x04`) forms. Bytes that do not
    /// decode to a point on the curve are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        secp256k1::PublicKey::from_slice(bytes)
            .map(|point| Self { point })
            .map_err(|_| KeyError::InvalidPublicKey)
    }

    /// Re-encode the point deterministically.
    ///
    /// Compressed form is 33 bytes, uncompressed is 65. The compressed
    /// encoding is the canonical basis for equality checks, addresses, and
    /// the wire format.
    pub fn format(&self, compress: bool) -> Vec<u8> {
        if compress {
            self.point.serialize().to_vec()
        } else {
            self.point.serialize_uncompressed().to_vec()
        }
    }

    /// Verify an ECDSA signature over `payload` with the default algorithm.
    ///
    /// Equivalent to `verify_with(payload, signature, SHA256_WITH_ECDSA)`.
    pub fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
        self.verify_with(payload, signature, SHA256_WITH_ECDSA)
    }

    /// Verify a signature over `payload` using the named algorithm.
    ///
    /// Returns `Ok(false)` both for a well-formed signature that does not
    /// match and for signature bytes that do not parse at all; the two
    /// cases are indistinguishable to the caller. An unknown algorithm
    /// name is an error.
    pub fn verify_with(
        &self,
        payload: &[u8],
        signature: &[u8],
        algorithm: &str,
    ) -> Result<bool, KeyError> {
        if algorithm != SHA256_WITH_ECDSA {
            return Err(KeyError::UnsupportedAlgorithm(algorithm.to_string()));
        }

        let digest = sha256(payload);
        let message = Message::from_digest_slice(&digest)?;

        // DER is the interchange form; 64-byte compact is accepted as a
        // fallback. Unparseable bytes fail the check like any bad signature.
        let parsed = ecdsa::Signature::from_der(signature)
            .or_else(|_| ecdsa::Signature::from_compact(signature));
        let sig = match parsed {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };

        let secp = Secp256k1::verification_only();
        Ok(secp.verify_ecdsa(&message, &sig, &self.point).is_ok())
    }

    /// Encrypt `payload` so that only the holder of the matching private
    /// key can read it. See [`seal::seal`] for the output layout.
    pub fn encrypt(&self, payload: &[u8]) -> Result<Vec<u8>, SealError> {
        seal::seal(self, payload)
    }

    /// Derive a blockchain address from this key
    /// Base58Check(version || RIPEMD160(SHA256(compressed point)) || checksum)
    pub fn to_address(&self) -> String {
        let sha256_hash = sha256(&self.point.serialize());

        let mut ripemd = Ripemd160::new();
        ripemd.update(&sha256_hash);
        let ripemd_hash = ripemd.finalize();

        let mut address_bytes = vec![ADDRESS_VERSION];
        address_bytes.extend_from_slice(&ripemd_hash);

        let checksum = double_sha256(&address_bytes);
        address_bytes.extend_from_slice(&checksum[..4]);

        bs58::encode(address_bytes).into_string()
    }

    pub(crate) fn inner(&self) -> &secp256k1::PublicKey {
        &self.point
    }
}

/// A secp256k1 private key.
///
/// Holds the signing scalar; the scalar bytes never appear in log output.
pub struct PrivateKey {
    secret: SecretKey,
}

impl PrivateKey {
    /// Generate a fresh private key from the operating system CSPRNG.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, _) = secp.generate_keypair(&mut OsRng);
        Self { secret }
    }

    /// Restore a private key from its 32-byte scalar encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        SecretKey::from_slice(bytes)
            .map(|secret| Self { secret })
            .map_err(|_| KeyError::InvalidPrivateKey)
    }

    /// The raw 32-byte scalar, for key transport.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.secret.secret_bytes()
    }

    /// The public key matching this private key.
    pub fn public_key(&self) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey {
            point: secp256k1::PublicKey::from_secret_key(&secp, &self.secret),
        }
    }

    /// Derive the Diffie-Hellman shared secret with a peer's public key.
    ///
    /// Both sides of an exchange arrive at the same 32 bytes; the result
    /// is already hashed and usable directly as a 256-bit symmetric key.
    pub fn ecdh(&self, peer: &PublicKey) -> [u8; 32] {
        SharedSecret::new(peer.inner(), &self.secret).secret_bytes()
    }

    /// Sign `payload` with SHA256withECDSA, producing a DER signature.
    pub fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, KeyError> {
        let digest = sha256(payload);
        let message = Message::from_digest_slice(&digest)?;
        let secp = Secp256k1::signing_only();
        let signature = secp.sign_ecdsa(&message, &self.secret);
        Ok(signature.serialize_der().to_vec())
    }

    /// Open a sealed payload addressed to this key. See [`seal::open`].
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, SealError> {
        seal::open(self, sealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_point_encoding_round_trip() {
        let key = PrivateKey::generate().public_key();

        let compressed = key.format(true);
        let uncompressed = key.format(false);
        assert_eq!(compressed.len(), 33);
        assert_eq!(uncompressed.len(), 65);
        assert!(matches!(compressed[0], 0x02 | 0x03));
        assert_eq!(uncompressed[0], 0x04);

        assert_eq!(PublicKey::from_bytes(&compressed).unwrap(), key);
        assert_eq!(PublicKey::from_bytes(&uncompressed).unwrap(), key);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(
            PublicKey::from_bytes(&[0u8; 33]),
            Err(KeyError::InvalidPublicKey)
        ));
        assert!(matches!(
            PublicKey::from_bytes(b"not a point"),
            Err(KeyError::InvalidPublicKey)
        ));
    }

    #[test]
    fn test_equality_over_key_material() {
        let key = PrivateKey::generate().public_key();
        let other = PrivateKey::generate().public_key();

        let mut set = HashSet::new();
        set.insert(key);
        set.insert(PublicKey::from_bytes(&key.format(false)).unwrap());
        set.insert(other);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_sign_and_verify() {
        let key = PrivateKey::generate();
        let payload = b"transfer 10 coins to bob";

        let signature = key.sign(payload).unwrap();
        assert!(key.public_key().verify(payload, &signature).unwrap());
    }

    #[test]
    fn test_flipped_payload_bit_fails() {
        let key = PrivateKey::generate();
        let payload = b"transfer 10 coins to bob".to_vec();
        let signature = key.sign(&payload).unwrap();

        let mut tampered = payload.clone();
        tampered[0] ^= 0x01;
        assert!(!key.public_key().verify(&tampered, &signature).unwrap());
    }

    #[test]
    fn test_flipped_signature_bit_fails() {
        let key = PrivateKey::generate();
        let payload = b"transfer 10 coins to bob";
        let mut signature = key.sign(payload).unwrap();

        let last = signature.len() - 1;
        signature[last] ^= 0x01;
        assert!(!key.public_key().verify(payload, &signature).unwrap());
    }

    #[test]
    fn test_malformed_signature_is_false_not_error() {
        let key = PrivateKey::generate().public_key();
        assert!(!key.verify(b"payload", b"").unwrap());
        assert!(!key.verify(b"payload", &[0xFF; 7]).unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let signer = PrivateKey::generate();
        let stranger = PrivateKey::generate().public_key();
        let payload = b"payload";

        let signature = signer.sign(payload).unwrap();
        assert!(!stranger.verify(payload, &signature).unwrap());
    }

    #[test]
    fn test_compact_signature_accepted() {
        let key = PrivateKey::generate();
        let payload = b"compact form";

        let der = key.sign(payload).unwrap();
        let compact = ecdsa::Signature::from_der(&der)
            .unwrap()
            .serialize_compact()
            .to_vec();
        assert_eq!(compact.len(), 64);
        assert!(key.public_key().verify(payload, &compact).unwrap());
    }

    #[test]
    fn test_unsupported_algorithm() {
        let key = PrivateKey::generate();
        let signature = key.sign(b"payload").unwrap();

        let result = key
            .public_key()
            .verify_with(b"payload", &signature, "SHA1withECDSA");
        assert!(matches!(result, Err(KeyError::UnsupportedAlgorithm(name)) if name == "SHA1withECDSA"));
    }

    #[test]
    fn test_private_key_round_trip() {
        let key = PrivateKey::generate();
        let restored = PrivateKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(key.public_key(), restored.public_key());
    }

    #[test]
    fn test_ecdh_is_symmetric() {
        let alice = PrivateKey::generate();
        let bob = PrivateKey::generate();

        let alice_side = alice.ecdh(&bob.public_key());
        let bob_side = bob.ecdh(&alice.public_key());
        assert_eq!(alice_side, bob_side);

        let carol = PrivateKey::generate();
        assert_ne!(alice.ecdh(&carol.public_key()), alice_side);
    }

    #[test]
    fn test_address_format() {
        let key = PrivateKey::generate().public_key();
        let address = key.to_address();
        // Version byte 0x00 maps to a leading '1' in Base58Check
        assert!(address.starts_with('1'));
        assert_eq!(key.to_address(), address);
    }
}
