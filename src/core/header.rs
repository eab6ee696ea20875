//! Block header record
//!
//! The canonical set of header fields together with the two lossless
//! transforms that anchor a block on the wire: building a header from a
//! decoded binary dictionary, and serializing one back to bytes.

use chrono::{DateTime, NaiveDateTime, Utc};
use ciborium::value::Value;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{self, CodecError};
use crate::crypto::BlockHash;

/// Wire format of header timestamps: UTC with six fractional-second
/// digits and a literal `Z` suffix, e.g. `2021-09-06T04:46:39.123456Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

// Dictionary keys. Single ASCII characters, fixed by the wire format:
// changing any of them breaks hash compatibility with existing chains.
const KEY_INDEX: &str = "i";
const KEY_TIMESTAMP: &str = "t";
const KEY_DIFFICULTY: &str = "d";
const KEY_TOTAL_DIFFICULTY: &str = "T";
const KEY_NONCE: &str = "n";
const KEY_MINER: &str = "m";
const KEY_PREVIOUS_HASH: &str = "p";
const KEY_TX_HASH: &str = "x";
const KEY_HASH: &str = "h";

/// Errors raised while rebuilding a header from bytes
#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("malformed header encoding: {0}")]
    Decoding(String),
    #[error("missing or mistyped header field {0:?}")]
    MissingField(&'static str),
}

impl From<CodecError> for HeaderError {
    fn from(e: CodecError) -> Self {
        HeaderError::Decoding(e.to_string())
    }
}

/// Render a moment in time as header timestamp text.
pub fn format_timestamp(moment: DateTime<Utc>) -> String {
    moment.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse header timestamp text under the fixed format.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

/// Metadata anchoring a block into the hash-linked, difficulty-weighted
/// chain.
///
/// Headers are immutable values once built, either directly from fields
/// (a freshly mined block) or by [`BlockHeader::deserialize`]. The
/// timestamp is kept as text so that validation owns parse failures.
/// `miner`, `previous_hash`, and `tx_hash` use the empty byte sequence to
/// mean "absent"; on the wire an absent field is omitted entirely rather
/// than written as an empty value, and that asymmetry is load-bearing for
/// byte-stable round-trips against existing chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height, 0 for the genesis block
    pub index: i64,
    /// Creation time as timestamp text (see [`TIMESTAMP_FORMAT`])
    pub timestamp: String,
    /// Proof-of-work solution, opaque length
    pub nonce: Vec<u8>,
    /// Address of the block producer, empty when absent
    pub miner: Vec<u8>,
    /// Per-block proof-of-work target contribution
    pub difficulty: u64,
    /// Cumulative chain difficulty through this block
    pub total_difficulty: U256,
    /// Hash of the preceding header, empty for the genesis block
    pub previous_hash: Vec<u8>,
    /// Digest summarizing the block's transactions, empty when absent
    pub tx_hash: Vec<u8>,
    /// Self-hash, must satisfy `difficulty`
    pub hash: BlockHash,
}

impl BlockHeader {
    /// Rebuild a header from its canonical dictionary encoding.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, HeaderError> {
        let value = codec::decode(bytes)?;
        Self::from_dictionary(&value)
    }

    /// Build a header from an already decoded dictionary value.
    pub fn from_dictionary(value: &Value) -> Result<Self, HeaderError> {
        let entries = value
            .as_map()
            .ok_or_else(|| HeaderError::Decoding("top-level value is not a dictionary".into()))?;

        Ok(Self {
            index: require(entries, KEY_INDEX, codec::as_i64)?,
            timestamp: require(entries, KEY_TIMESTAMP, |v| {
                v.as_text().map(str::to_string)
            })?,
            nonce: require(entries, KEY_NONCE, |v| v.as_bytes().cloned())?,
            miner: optional_bytes(entries, KEY_MINER)?,
            difficulty: require(entries, KEY_DIFFICULTY, codec::as_u64)?,
            total_difficulty: require(entries, KEY_TOTAL_DIFFICULTY, codec::as_u256)?,
            previous_hash: optional_bytes(entries, KEY_PREVIOUS_HASH)?,
            tx_hash: optional_bytes(entries, KEY_TX_HASH)?,
            hash: require(entries, KEY_HASH, |v| {
                v.as_bytes().and_then(|b| BlockHash::from_slice(b))
            })?,
        })
    }

    /// Represent this header as a dictionary value.
    ///
    /// Optional fields are emitted only when non-empty.
    pub fn to_dictionary(&self) -> Value {
        self.dictionary(true)
    }

    /// Serialize this header to its canonical byte encoding.
    pub fn serialize(&self) -> Vec<u8> {
        codec::encode(&self.to_dictionary())
    }

    /// The bytes a miner hashes: the canonical encoding with the
    /// self-hash entry left out.
    pub fn hashing_bytes(&self) -> Vec<u8> {
        codec::encode(&self.dictionary(false))
    }

    /// Recompute the self-hash over [`BlockHeader::hashing_bytes`].
    pub fn compute_hash(&self) -> BlockHash {
        BlockHash::compute(&self.hashing_bytes())
    }

    fn dictionary(&self, include_hash: bool) -> Value {
        let mut entries = vec![
            (
                Value::Text(KEY_INDEX.into()),
                Value::Integer(self.index.into()),
            ),
            (
                Value::Text(KEY_TIMESTAMP.into()),
                Value::Text(self.timestamp.clone()),
            ),
            (
                Value::Text(KEY_DIFFICULTY.into()),
                Value::Integer(self.difficulty.into()),
            ),
            (
                Value::Text(KEY_TOTAL_DIFFICULTY.into()),
                codec::u256_value(self.total_difficulty),
            ),
            (Value::Text(KEY_NONCE.into()), Value::Bytes(self.nonce.clone())),
        ];
        if !self.miner.is_empty() {
            entries.push((Value::Text(KEY_MINER.into()), Value::Bytes(self.miner.clone())));
        }
        if !self.previous_hash.is_empty() {
            entries.push((
                Value::Text(KEY_PREVIOUS_HASH.into()),
                Value::Bytes(self.previous_hash.clone()),
            ));
        }
        if !self.tx_hash.is_empty() {
            entries.push((
                Value::Text(KEY_TX_HASH.into()),
                Value::Bytes(self.tx_hash.clone()),
            ));
        }
        if include_hash {
            entries.push((
                Value::Text(KEY_HASH.into()),
                Value::Bytes(self.hash.as_bytes().to_vec()),
            ));
        }
        Value::Map(entries)
    }
}

fn require<T>(
    entries: &[(Value, Value)],
    key: &'static str,
    read: impl FnOnce(&Value) -> Option<T>,
) -> Result<T, HeaderError> {
    codec::lookup(entries, key)
        .and_then(read)
        .ok_or(HeaderError::MissingField(key))
}

/// Optional byte fields default to empty when the key is omitted; a key
/// that is present but not a byte string is still an error.
fn optional_bytes(entries: &[(Value, Value)], key: &'static str) -> Result<Vec<u8>, HeaderError> {
    match codec::lookup(entries, key) {
        None => Ok(Vec::new()),
        Some(value) => value
            .as_bytes()
            .cloned()
            .ok_or(HeaderError::MissingField(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_header() -> BlockHeader {
        let mut header = BlockHeader {
            index: 5,
            timestamp: "2021-09-06T04:46:39.123456Z".to_string(),
            nonce: vec![0x01, 0x02, 0x03],
            miner: b"miner address".to_vec(),
            difficulty: 3,
            total_difficulty: U256::from(12u64),
            previous_hash: vec![0xAA; 32],
            tx_hash: vec![0xBB; 32],
            hash: BlockHash::from_bytes([0; 32]),
        };
        header.hash = header.compute_hash();
        header
    }

    #[test]
    fn test_round_trip_with_all_fields() {
        let header = sample_header();
        let decoded = BlockHeader::deserialize(&header.serialize()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_round_trip_without_optional_fields() {
        let mut header = sample_header();
        header.index = 0;
        header.miner = Vec::new();
        header.previous_hash = Vec::new();
        header.tx_hash = Vec::new();

        let decoded = BlockHeader::deserialize(&header.serialize()).unwrap();
        assert_eq!(decoded, header);
        assert!(decoded.miner.is_empty());
        assert!(decoded.previous_hash.is_empty());
        assert!(decoded.tx_hash.is_empty());
    }

    #[test]
    fn test_empty_optional_fields_are_omitted_on_wire() {
        let mut header = sample_header();
        header.miner = Vec::new();
        header.tx_hash = Vec::new();

        let decoded = codec::decode(&header.serialize()).unwrap();
        let entries = decoded.as_map().unwrap();
        assert!(codec::lookup(entries, "m").is_none());
        assert!(codec::lookup(entries, "x").is_none());
        assert!(codec::lookup(entries, "p").is_some());
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let header = sample_header();
        assert_eq!(header.serialize(), header.serialize());
    }

    #[test]
    fn test_hashing_bytes_exclude_self_hash() {
        let header = sample_header();
        let decoded = codec::decode(&header.hashing_bytes()).unwrap();
        let entries = decoded.as_map().unwrap();
        assert!(codec::lookup(entries, "h").is_none());
        assert!(codec::lookup(entries, "i").is_some());

        // The self-hash does not feed back into the hashed bytes
        let mut rehashed = header.clone();
        rehashed.hash = BlockHash::from_bytes([0xFF; 32]);
        assert_eq!(rehashed.compute_hash(), header.compute_hash());
    }

    #[test]
    fn test_non_dictionary_input_is_a_decoding_error() {
        let bytes = codec::encode(&Value::Integer(7.into()));
        assert!(matches!(
            BlockHeader::deserialize(&bytes),
            Err(HeaderError::Decoding(_))
        ));
    }

    #[test]
    fn test_garbage_bytes_are_a_decoding_error() {
        assert!(matches!(
            BlockHeader::deserialize(&[0xFF, 0xFF, 0xFF]),
            Err(HeaderError::Decoding(_))
        ));
    }

    #[test]
    fn test_missing_required_field() {
        let header = sample_header();
        let value = header.to_dictionary();
        let mut entries = value.as_map().unwrap().clone();
        entries.retain(|(k, _)| k.as_text() != Some("t"));

        let bytes = codec::encode(&Value::Map(entries));
        assert!(matches!(
            BlockHeader::deserialize(&bytes),
            Err(HeaderError::MissingField("t"))
        ));
    }

    #[test]
    fn test_mistyped_required_field() {
        let header = sample_header();
        let value = header.to_dictionary();
        let mut entries = value.as_map().unwrap().clone();
        for (k, v) in entries.iter_mut() {
            if k.as_text() == Some("i") {
                *v = Value::Text("five".into());
            }
        }

        let bytes = codec::encode(&Value::Map(entries));
        assert!(matches!(
            BlockHeader::deserialize(&bytes),
            Err(HeaderError::MissingField("i"))
        ));
    }

    #[test]
    fn test_wrong_length_hash_is_mistyped() {
        let header = sample_header();
        let value = header.to_dictionary();
        let mut entries = value.as_map().unwrap().clone();
        for (k, v) in entries.iter_mut() {
            if k.as_text() == Some("h") {
                *v = Value::Bytes(vec![0x01; 31]);
            }
        }

        let bytes = codec::encode(&Value::Map(entries));
        assert!(matches!(
            BlockHeader::deserialize(&bytes),
            Err(HeaderError::MissingField("h"))
        ));
    }

    #[test]
    fn test_large_total_difficulty_round_trip() {
        let mut header = sample_header();
        header.difficulty = u64::MAX;
        header.total_difficulty = U256::MAX - U256::one();

        let decoded = BlockHeader::deserialize(&header.serialize()).unwrap();
        assert_eq!(decoded.total_difficulty, header.total_difficulty);
    }

    #[test]
    fn test_timestamp_format_round_trip() {
        let moment = Utc.with_ymd_and_hms(2021, 9, 6, 4, 46, 39).unwrap()
            + chrono::Duration::microseconds(123456);
        let text = format_timestamp(moment);
        assert_eq!(text, "2021-09-06T04:46:39.123456Z");
        assert_eq!(parse_timestamp(&text).unwrap(), moment);
    }

    #[test]
    fn test_timestamp_parse_is_strict() {
        assert!(parse_timestamp("2021-09-06T04:46:39Z").is_err());
        assert!(parse_timestamp("2021-09-06T04:46:39.123Z").is_err());
        assert!(parse_timestamp("2021-09-06T04:46:39.123456").is_err());
        assert!(parse_timestamp("2021-09-06 04:46:39.123456Z").is_err());
        assert!(parse_timestamp("not a timestamp").is_err());
    }

    #[test]
    fn test_json_representation_round_trip() {
        let header = sample_header();
        let json = serde_json::to_string(&header).unwrap();
        let back: BlockHeader = serde_json::from_str(&json).unwrap();
        assert_eq!(back, header);
    }
}
