//! COSE header maps
//!
//! A [`Header`] maps small integer labels to CBOR values. Envelopes and
//! recipients each carry two of them: the protected header (serialized and
//! covered by the MAC / signature / AEAD) and the unprotected header.

use std::collections::BTreeMap;

use ciborium::Value;

use crate::cbor::{self, CodecError};

/// Registered header parameter labels
pub mod label {
    pub const ALG: i64 = 1;
    pub const CRIT: i64 = 2;
    pub const CONTENT_TYPE: i64 = 3;
    pub const KID: i64 = 4;
    pub const IV: i64 = 5;
    pub const PARTIAL_IV: i64 = 6;

    // Key agreement / derivation parameters
    pub const SALT: i64 = -20;
    pub const PARTY_U_IDENTITY: i64 = -21;
    pub const PARTY_U_NONCE: i64 = -22;
    pub const PARTY_U_OTHER: i64 = -23;
    pub const PARTY_V_IDENTITY: i64 = -24;
    pub const PARTY_V_NONCE: i64 = -25;
    pub const PARTY_V_OTHER: i64 = -26;
}

/// Integer-labelled header map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header(BTreeMap<i64, Value>);

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, label: i64, value: impl Into<Value>) -> Self {
        self.0.insert(label, value.into());
        self
    }

    pub fn insert(&mut self, label: i64, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(label, value.into())
    }

    pub fn get(&self, label: i64) -> Option<&Value> {
        self.0.get(&label)
    }

    pub fn contains(&self, label: i64) -> bool {
        self.0.contains_key(&label)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&i64, &Value)> {
        self.0.iter()
    }

    /// The `alg` parameter, which must be an integer when present
    pub fn alg(&self) -> Result<Option<i64>, CodecError> {
        self.int_param("alg", label::ALG)
    }

    /// The `kid` parameter, which must be a byte string when present
    pub fn kid(&self) -> Result<Option<&[u8]>, CodecError> {
        self.bytes_param("kid", label::KID)
    }

    /// The `IV` parameter, which must be a byte string when present
    pub fn iv(&self) -> Result<Option<&[u8]>, CodecError> {
        self.bytes_param("iv", label::IV)
    }

    /// The `salt` parameter, which must be a byte string when present
    pub fn salt(&self) -> Result<Option<&[u8]>, CodecError> {
        self.bytes_param("salt", label::SALT)
    }

    pub fn int_param(&self, name: &'static str, label: i64) -> Result<Option<i64>, CodecError> {
        match self.get(label) {
            None => Ok(None),
            Some(v) => cbor::as_i64(v).map(Some).ok_or(CodecError::InvalidHeader {
                name,
                label,
                expected: "int",
            }),
        }
    }

    pub fn bytes_param(
        &self,
        name: &'static str,
        label: i64,
    ) -> Result<Option<&[u8]>, CodecError> {
        match self.get(label) {
            None => Ok(None),
            Some(v) => cbor::as_bytes(v).map(Some).ok_or(CodecError::InvalidHeader {
                name,
                label,
                expected: "bytes",
            }),
        }
    }

    /// Convert to a CBOR map value
    pub fn to_value(&self) -> Value {
        Value::Map(
            self.0
                .iter()
                .map(|(k, v)| (cbor::int(*k), v.clone()))
                .collect(),
        )
    }

    /// Parse a CBOR map whose keys are all integers
    pub fn from_value(value: &Value) -> Result<Self, CodecError> {
        let entries = value
            .as_map()
            .ok_or_else(|| CodecError::Malformed("header should be a map".to_string()))?;
        let mut header = Header::new();
        for (k, v) in entries {
            let label = cbor::as_i64(k).ok_or_else(|| {
                CodecError::Malformed("header labels should be integers".to_string())
            })?;
            header.0.insert(label, v.clone());
        }
        Ok(header)
    }

    /// Serialize as the protected-header byte string.
    ///
    /// An empty header is a zero-length byte string, never an encoded empty map.
    pub fn to_protected_bytes(&self) -> Result<Vec<u8>, CodecError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        cbor::to_vec(&self.to_value())
    }

    /// Parse a protected-header byte string
    pub fn from_protected_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Ok(Header::new());
        }
        Self::from_value(&cbor::from_slice(bytes)?)
    }
}

impl FromIterator<(i64, Value)> for Header {
    fn from_iter<I: IntoIterator<Item = (i64, Value)>>(iter: I) -> Self {
        Header(iter.into_iter().collect())
    }
}
