//! Trust-layer core for a proof-of-work blockchain
//!
//! This crate provides the pieces a chain node must get right before
//! anything else can be trusted:
//! - secp256k1 key material with ECDSA signature verification
//! - Sealed messages (ephemeral ECDH plus ChaCha20-Poly1305)
//! - Canonical binary dictionary encoding of block headers
//! - Block header validation with one typed error kind per rule
//!
//! Peer networking, storage, mining loops, and transaction execution are
//! the business of other crates; they hand headers and payloads to this
//! one and branch on the typed results.
//!
//! # Example
//!
//! ```rust
//! use chain_trust::{validate, BlockHash, BlockHeader};
//! use chain_trust::core::format_timestamp;
//! use chrono::Utc;
//! use primitive_types::U256;
//!
//! let now = Utc::now();
//! let mut genesis = BlockHeader {
//!     index: 0,
//!     timestamp: format_timestamp(now),
//!     nonce: vec![0x2a],
//!     miner: Vec::new(),
//!     difficulty: 0,
//!     total_difficulty: U256::zero(),
//!     previous_hash: Vec::new(),
//!     tx_hash: Vec::new(),
//!     hash: BlockHash::from_bytes([0; 32]),
//! };
//! genesis.hash = genesis.compute_hash();
//!
//! let bytes = genesis.serialize();
//! let decoded = BlockHeader::deserialize(&bytes).unwrap();
//! assert_eq!(decoded, genesis);
//! assert!(validate(&decoded, now).is_ok());
//! ```

pub mod codec;
pub mod core;
pub mod crypto;

// Re-export commonly used types
pub use crate::codec::CodecError;
pub use crate::core::{validate, BlockHeader, HeaderError, ValidationError, TIMESTAMP_FORMAT};
pub use crate::crypto::{
    pow_target, BlockHash, KeyError, PrivateKey, PublicKey, SealError, SHA256_WITH_ECDSA,
};
