//! Cryptographic hashing for the trust layer
//!
//! Provides SHA-256 based hashing functions, the fixed-size block hash
//! digest type, and the proof-of-work target arithmetic.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes double SHA-256 hash (SHA-256 of SHA-256)
/// Used for address checksums
pub fn double_sha256(data: &[u8]) -> Vec<u8> {
    sha256(&sha256(data))
}

/// Derive the numeric proof-of-work target from a difficulty.
///
/// A digest satisfies `difficulty` when its big-endian integer value is at
/// most the target. Difficulty 0 and 1 place the target at the top of the
/// range, so every digest qualifies; larger difficulties shrink the target
/// proportionally.
pub fn pow_target(difficulty: u64) -> U256 {
    if difficulty <= 1 {
        U256::MAX
    } else {
        U256::MAX / U256::from(difficulty)
    }
}

/// A 32-byte SHA-256 block hash digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    /// Compute the SHA-256 digest of the given data.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from a byte slice; `None` unless exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Check whether this digest meets the proof-of-work target for
    /// `difficulty`.
    ///
    /// The digest is interpreted as an unsigned big-endian integer and
    /// compared against [`pow_target`]. This is the canonical numeric
    /// comparison, not a leading-zero-bit count.
    pub fn satisfies(&self, difficulty: u64) -> bool {
        U256::from_big_endian(&self.0) <= pow_target(difficulty)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}

impl AsRef<[u8]> for BlockHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for BlockHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}
