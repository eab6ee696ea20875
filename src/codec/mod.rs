//! Canonical binary dictionary codec
//!
//! Headers and other protocol payloads travel as CBOR dictionaries
//! (RFC 8949) mapping short text keys to integers, byte strings, text,
//! and nested dictionaries. Encoding follows the Core Deterministic
//! Encoding rules so that a given dictionary always produces the same
//! bytes, and thus the same hash, on every platform:
//!
//! - map keys sorted by encoded byte comparison
//! - integers use the smallest valid encoding
//! - definite lengths only
//! - integers beyond the native range encode as tag-2 bignums with a
//!   minimal big-endian magnitude
//!
//! Decoding is delegated to `ciborium`; this module adds the canonical
//! encoder and the typed accessors the rest of the crate reads
//! dictionaries through.

use ciborium::value::{Integer, Value};
use primitive_types::U256;
use thiserror::Error;

/// CBOR tag for an unsigned bignum (RFC 8949 section 3.4.3)
const TAG_BIGNUM: u64 = 2;

/// Errors raised while decoding dictionary bytes
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed dictionary bytes: {0}")]
    Decode(String),
}

/// Decode a single value from `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Value, CodecError> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Encode a value to canonical bytes.
///
/// Only the value types of the dictionary model are supported; floats do
/// not occur in this protocol and are rejected with a panic rather than
/// silently encoded.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value(&mut buf, value);
    buf
}

fn encode_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(items) => {
            encode_uint(buf, 4, items.len() as u64);
            for item in items {
                encode_value(buf, item);
            }
        }
        Value::Map(entries) => encode_map(buf, entries),
        Value::Tag(tag, inner) => {
            encode_uint(buf, 6, *tag);
            encode_value(buf, inner);
        }
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        _ => panic!("value type not supported by the canonical dictionary encoding"),
    }
}

fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, and so on
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Write an unsigned integer with the given major type, using the
/// smallest valid encoding.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map with keys sorted by their encoded byte comparison.
fn encode_map(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut encoded: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(key, value)| {
            let mut key_buf = Vec::new();
            encode_value(&mut key_buf, key);
            (key_buf, value)
        })
        .collect();
    encoded.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, encoded.len() as u64);
    for (key_bytes, value) in encoded {
        buf.extend_from_slice(&key_bytes);
        encode_value(buf, value);
    }
}

/// Look up `key` among the entries of a decoded dictionary.
pub fn lookup<'a>(entries: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    entries
        .iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .map(|(_, v)| v)
}

/// Read a value as a signed 64-bit integer.
pub fn as_i64(value: &Value) -> Option<i64> {
    let n: i128 = value.as_integer()?.into();
    n.try_into().ok()
}

/// Read a value as an unsigned 64-bit integer.
pub fn as_u64(value: &Value) -> Option<u64> {
    let n: i128 = value.as_integer()?.into();
    n.try_into().ok()
}

/// Read a value as an unsigned 256-bit integer.
///
/// Accepts both native integers and tag-2 bignums of up to 32 bytes.
pub fn as_u256(value: &Value) -> Option<U256> {
    match value {
        Value::Integer(i) => {
            let n: i128 = (*i).into();
            if n < 0 {
                None
            } else {
                Some(U256::from(n as u128))
            }
        }
        Value::Tag(tag, inner) if *tag == TAG_BIGNUM => {
            let magnitude = inner.as_bytes()?;
            if magnitude.len() > 32 {
                return None;
            }
            Some(U256::from_big_endian(magnitude))
        }
        _ => None,
    }
}

/// Represent an unsigned 256-bit integer as a dictionary value.
///
/// Values within the native range stay native integers; anything larger
/// becomes a tag-2 bignum with leading zero bytes stripped.
pub fn u256_value(n: U256) -> Value {
    if n <= U256::from(u64::MAX) {
        Value::Integer(n.low_u64().into())
    } else {
        let mut buf = [0u8; 32];
        n.to_big_endian(&mut buf);
        let first = buf.iter().position(|&b| b != 0).unwrap_or(31);
        Value::Tag(TAG_BIGNUM, Box::new(Value::Bytes(buf[first..].to_vec())))
    }
}
