//! COSE message tags and to-be-authenticated structures
//!
//! MAC tags, signatures and AEAD associated data are never computed over the
//! raw payload. They cover a small CBOR array that binds the serialized
//! protected header and an (always empty here) external AAD.

use ciborium::Value;

use crate::cbor::{self, CodecError};

/// CBOR tag numbers
pub mod tag {
    pub const CWT: u64 = 61;
    pub const COSE_ENCRYPT0: u64 = 16;
    pub const COSE_MAC0: u64 = 17;
    pub const COSE_SIGN1: u64 = 18;
    pub const COSE_ENCRYPT: u64 = 96;
    pub const COSE_MAC: u64 = 97;
}

/// Context string placed first in each structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureContext {
    Mac0,
    Mac,
    Signature1,
    Encrypt0,
    Encrypt,
}

impl StructureContext {
    pub fn as_str(self) -> &'static str {
        match self {
            StructureContext::Mac0 => "MAC0",
            StructureContext::Mac => "MAC",
            StructureContext::Signature1 => "Signature1",
            StructureContext::Encrypt0 => "Encrypt0",
            StructureContext::Encrypt => "Encrypt",
        }
    }
}

/// `MAC_structure = [context, protected, external_aad, payload]`
pub fn mac_structure(
    context: StructureContext,
    protected: &[u8],
    external_aad: &[u8],
    payload: &[u8],
) -> Result<Vec<u8>, CodecError> {
    cbor::to_vec(&Value::Array(vec![
        Value::Text(context.as_str().to_string()),
        Value::Bytes(protected.to_vec()),
        Value::Bytes(external_aad.to_vec()),
        Value::Bytes(payload.to_vec()),
    ]))
}

/// `Sig_structure = ["Signature1", protected, external_aad, payload]`
pub fn sig_structure(
    protected: &[u8],
    external_aad: &[u8],
    payload: &[u8],
) -> Result<Vec<u8>, CodecError> {
    mac_structure(StructureContext::Signature1, protected, external_aad, payload)
}

/// `Enc_structure = [context, protected, external_aad]`, used as AEAD associated data
pub fn enc_structure(
    context: StructureContext,
    protected: &[u8],
    external_aad: &[u8],
) -> Result<Vec<u8>, CodecError> {
    cbor::to_vec(&Value::Array(vec![
        Value::Text(context.as_str().to_string()),
        Value::Bytes(protected.to_vec()),
        Value::Bytes(external_aad.to_vec()),
    ]))
}
