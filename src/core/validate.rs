//! Block header validation
//!
//! A pure function of a header and a caller-supplied current time. The
//! clock is injected rather than read internally, so validation is
//! deterministic and replayable; nothing here performs I/O or mutates
//! state.

use chrono::{DateTime, Duration, Utc};
use primitive_types::U256;
use thiserror::Error;

use super::header::{parse_timestamp, BlockHeader};
use crate::crypto::BlockHash;

/// Maximum allowed timestamp drift into the future (seconds)
pub const MAX_FUTURE_TIMESTAMP_SKEW: i64 = 15;

/// A violated header invariant, one discriminant per rule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("timestamp {0:?} does not parse or lies too far in the future")]
    InvalidTimestamp(String),
    #[error("negative block index {0}")]
    InvalidIndex(i64),
    #[error("difficulty {difficulty} is invalid for block #{index}")]
    InvalidDifficulty { index: i64, difficulty: u64 },
    #[error("total difficulty {total_difficulty} is invalid for block #{index} with difficulty {difficulty}")]
    InvalidTotalDifficulty {
        index: i64,
        difficulty: u64,
        total_difficulty: U256,
    },
    #[error("block #{0} has an invalid previous hash reference")]
    InvalidPreviousHash(i64),
    #[error("hash {hash} does not satisfy difficulty {difficulty}")]
    InvalidNonce { hash: BlockHash, difficulty: u64 },
}

/// Check every structural, temporal, and proof-of-work invariant of a
/// single header.
///
/// The first violated rule is reported; a header passing this check is
/// internally well-formed and honestly proof-of-worked, though whether it
/// extends a particular chain is for the caller to decide.
pub fn validate(header: &BlockHeader, now: DateTime<Utc>) -> Result<(), ValidationError> {
    let result = run_checks(header, now);
    if let Err(ref violation) = result {
        log::debug!("header #{} rejected: {}", header.index, violation);
    }
    result
}

fn run_checks(header: &BlockHeader, now: DateTime<Utc>) -> Result<(), ValidationError> {
    // Timestamp must parse under the fixed format and must not lie
    // materially in the future.
    match parse_timestamp(&header.timestamp) {
        Ok(moment) => {
            if moment > now + Duration::seconds(MAX_FUTURE_TIMESTAMP_SKEW) {
                return Err(ValidationError::InvalidTimestamp(header.timestamp.clone()));
            }
        }
        Err(_) => {
            return Err(ValidationError::InvalidTimestamp(header.timestamp.clone()));
        }
    }

    if header.index < 0 {
        return Err(ValidationError::InvalidIndex(header.index));
    }

    if header.index == 0 {
        // Genesis carries no difficulty and no parent.
        if header.difficulty != 0 {
            return Err(ValidationError::InvalidDifficulty {
                index: header.index,
                difficulty: header.difficulty,
            });
        }
        if !header.total_difficulty.is_zero() {
            return Err(ValidationError::InvalidTotalDifficulty {
                index: header.index,
                difficulty: header.difficulty,
                total_difficulty: header.total_difficulty,
            });
        }
        if !header.previous_hash.is_empty() {
            return Err(ValidationError::InvalidPreviousHash(header.index));
        }
    } else {
        if header.difficulty < 1 {
            return Err(ValidationError::InvalidDifficulty {
                index: header.index,
                difficulty: header.difficulty,
            });
        }
        if header.previous_hash.is_empty() {
            return Err(ValidationError::InvalidPreviousHash(header.index));
        }
    }

    // A block cannot contribute more difficulty than the chain has
    // accumulated through it.
    if U256::from(header.difficulty) > header.total_difficulty {
        return Err(ValidationError::InvalidTotalDifficulty {
            index: header.index,
            difficulty: header.difficulty,
            total_difficulty: header.total_difficulty,
        });
    }

    if !header.hash.satisfies(header.difficulty) {
        return Err(ValidationError::InvalidNonce {
            hash: header.hash,
            difficulty: header.difficulty,
        });
    }

    Ok(())
}
