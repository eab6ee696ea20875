//! Cryptographic primitives for the trust layer
//!
//! This module provides:
//! - SHA-256 hashing and proof-of-work targets
//! - secp256k1 key material, ECDSA verification, and addresses
//! - Sealed (authenticated, confidential) messages between participants

pub mod hash;
pub mod keys;
pub mod seal;

pub use hash::{double_sha256, pow_target, sha256, BlockHash};
pub use keys::{KeyError, PrivateKey, PublicKey, SHA256_WITH_ECDSA};
pub use seal::{open, seal, SealError, EPHEMERAL_KEY_LEN, NONCE_LEN, TAG_LEN};
