//! Claims payload
//!
//! A CWT body is a CBOR map from integer labels to values. The envelope engine
//! treats it as opaque bytes; [`Claims::validate`] only checks the types of the
//! registered claims before encoding and after decoding.

use std::collections::BTreeMap;

use ciborium::Value;
use cwt_protocol::cbor;

use crate::error::CwtError;

/// Registered claim keys
pub mod label {
    pub const ISS: i64 = 1;
    pub const SUB: i64 = 2;
    pub const AUD: i64 = 3;
    pub const EXP: i64 = 4;
    pub const NBF: i64 = 5;
    pub const IAT: i64 = 6;
    pub const CTI: i64 = 7;
    pub const CNF: i64 = 8;

    pub const HCERT: i64 = -260;
    pub const EUPH_NONCE: i64 = -259;
    pub const EAT_MAROE_PREFIX: i64 = -258;
    pub const EAT_FDO: i64 = -257;
}

#[derive(Clone, Copy)]
enum ClaimType {
    Text,
    NumericDate,
    Bytes,
    Map,
    Array,
}

const REGISTERED: &[(i64, &str, ClaimType)] = &[
    (label::ISS, "iss", ClaimType::Text),
    (label::SUB, "sub", ClaimType::Text),
    (label::AUD, "aud", ClaimType::Text),
    (label::EXP, "exp", ClaimType::NumericDate),
    (label::NBF, "nbf", ClaimType::NumericDate),
    (label::IAT, "iat", ClaimType::NumericDate),
    (label::CTI, "cti", ClaimType::Bytes),
    (label::CNF, "cnf", ClaimType::Map),
    (label::HCERT, "hcert", ClaimType::Map),
    (label::EUPH_NONCE, "EUPHNonce", ClaimType::Bytes),
    (label::EAT_MAROE_PREFIX, "EATMAROEPrefix", ClaimType::Bytes),
    (label::EAT_FDO, "EAT-FDO", ClaimType::Array),
];

/// Integer-labelled claims set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Claims(BTreeMap<i64, Value>);

impl Claims {
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

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&i64, &Value)> {
        self.0.iter()
    }

    pub fn issuer(&self) -> Option<&str> {
        self.get(label::ISS).and_then(Value::as_text)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get(label::SUB).and_then(Value::as_text)
    }

    pub fn audience(&self) -> Option<&str> {
        self.get(label::AUD).and_then(Value::as_text)
    }

    /// `exp` in whole seconds
    pub fn expiration(&self) -> Option<i64> {
        self.get(label::EXP).and_then(numeric_date)
    }

    /// `nbf` in whole seconds
    pub fn not_before(&self) -> Option<i64> {
        self.get(label::NBF).and_then(numeric_date)
    }

    /// `iat` in whole seconds
    pub fn issued_at(&self) -> Option<i64> {
        self.get(label::IAT).and_then(numeric_date)
    }

    pub fn cti(&self) -> Option<&[u8]> {
        self.get(label::CTI).and_then(cbor::as_bytes)
    }

    /// Check the types of registered claims
    pub fn validate(&self) -> Result<(), CwtError> {
        for &(label, name, ty) in REGISTERED {
            let Some(value) = self.get(label) else {
                continue;
            };
            let (ok, expected) = match ty {
                ClaimType::Text => (value.is_text(), "str"),
                ClaimType::NumericDate => (
                    value.is_integer() || value.is_float(),
                    "int or float",
                ),
                ClaimType::Bytes => (value.is_bytes(), "bytes"),
                ClaimType::Map => (value.is_map(), "map"),
                ClaimType::Array => (value.is_array(), "array"),
            };
            if !ok {
                return Err(CwtError::InvalidClaims(format!(
                    "{name}({label}) should be {expected}."
                )));
            }
        }
        Ok(())
    }

    pub fn to_value(&self) -> Value {
        Value::Map(
            self.0
                .iter()
                .map(|(k, v)| (cbor::int(*k), v.clone()))
                .collect(),
        )
    }

    pub fn from_value(value: &Value) -> Result<Self, CwtError> {
        let entries = value
            .as_map()
            .ok_or_else(|| CwtError::Malformed("payload should be a CBOR map".to_string()))?;
        entries
            .iter()
            .map(|(k, v)| {
                cbor::as_i64(k)
                    .map(|label| (label, v.clone()))
                    .ok_or_else(|| CwtError::Malformed("claim keys should be integers".to_string()))
            })
            .collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CwtError> {
        Ok(cbor::to_vec(&self.to_value())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CwtError> {
        Self::from_value(&cbor::from_slice(bytes)?)
    }
}

impl FromIterator<(i64, Value)> for Claims {
    fn from_iter<I: IntoIterator<Item = (i64, Value)>>(iter: I) -> Self {
        Claims(iter.into_iter().collect())
    }
}

fn numeric_date(value: &Value) -> Option<i64> {
    match value {
        Value::Float(f) if f.is_finite() => Some(f.floor() as i64),
        v => cbor::as_i64(v),
    }
}
