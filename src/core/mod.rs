//! Core chain components
//!
//! This module contains the structural side of the trust layer:
//! - Block headers (canonical fields, dictionary encoding, self-hash)
//! - Header validation (structural rules and the proof-of-work check)

pub mod header;
pub mod validate;

pub use header::{format_timestamp, parse_timestamp, BlockHeader, HeaderError, TIMESTAMP_FORMAT};
pub use validate::{validate, ValidationError, MAX_FUTURE_TIMESTAMP_SKEW};
