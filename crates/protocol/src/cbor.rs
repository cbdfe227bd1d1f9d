//! CBOR codec entry points
//!
//! Every byte string that crosses the envelope boundary goes through
//! [`to_vec`] and [`from_slice`]. Tag numbers, indefinite-length items and
//! canonical ordering are left to `ciborium`.

use ciborium::Value;
use thiserror::Error;

/// Codec and structural errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("CBOR serialization failed: {0}")]
    Serialize(String),

    #[error("CBOR deserialization failed: {0}")]
    Deserialize(String),

    /// Well-formed CBOR that does not have the expected shape
    #[error("malformed structure: {0}")]
    Malformed(String),

    /// A header parameter carries a value of the wrong type
    #[error("{name}({label}) should be {expected}.")]
    InvalidHeader {
        name: &'static str,
        label: i64,
        expected: &'static str,
    },
}

/// Serialize a value to CBOR bytes
pub fn to_vec(value: &Value) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CodecError::Serialize(e.to_string()))?;
    Ok(buf)
}

/// Deserialize CBOR bytes into a value
pub fn from_slice(bytes: &[u8]) -> Result<Value, CodecError> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::Deserialize(e.to_string()))
}

/// Build an integer value
pub fn int(v: i64) -> Value {
    Value::Integer(v.into())
}

/// Read a value as `i64`, if it is an integer that fits
pub fn as_i64(value: &Value) -> Option<i64> {
    value.as_integer().and_then(|i| i64::try_from(i).ok())
}

/// Read a value as a byte string
pub fn as_bytes(value: &Value) -> Option<&[u8]> {
    value.as_bytes().map(Vec::as_slice)
}

/// Read a value as an array of exactly `len` elements
pub fn expect_array<'a>(
    value: &'a Value,
    what: &str,
    len: std::ops::RangeInclusive<usize>,
) -> Result<&'a [Value], CodecError> {
    let items = value
        .as_array()
        .ok_or_else(|| CodecError::Malformed(format!("{what} should be an array")))?;
    if !len.contains(&items.len()) {
        return Err(CodecError::Malformed(format!(
            "{what} should have {}..={} elements, got {}",
            len.start(),
            len.end(),
            items.len()
        )));
    }
    Ok(items)
}
