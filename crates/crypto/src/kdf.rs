//! HKDF key derivation and the COSE KDF context
//!
//! The derivation input is the CBOR array
//!
//! ```text
//! COSE_KDF_Context = [
//!     AlgorithmID,
//!     PartyUInfo  = [identity / nil, nonce / nil, other / nil],
//!     PartyVInfo  = [identity / nil, nonce / nil, other / nil],
//!     SuppPubInfo = [keyDataLength, protected, ? other],
//! ]
//! ```
//!
//! `keyDataLength` always comes from the target algorithm's registry row.

use ciborium::Value;
use cwt_protocol::{cbor, label, Header};
use hkdf::Hkdf;
use serde_json::Value as Json;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use crate::algorithm::{Algorithm, AlgorithmClass, Primitive};
use crate::error::CoseError;
use crate::helpers::ct_eq;
use crate::key::{CoseKey, KeyOp};

pub fn hkdf_sha256(
    material: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    out: &mut [u8],
) -> Result<(), String> {
    Hkdf::<Sha256>::new(salt, material)
        .expand(info, out)
        .map_err(|e| e.to_string())
}

pub fn hkdf_sha512(
    material: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    out: &mut [u8],
) -> Result<(), String> {
    Hkdf::<Sha512>::new(salt, material)
        .expand(info, out)
        .map_err(|e| e.to_string())
}

/// PartyU / PartyV nonce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartyNonce {
    Bytes(Vec<u8>),
    Int(i64),
}

/// Identity, nonce and other information of one party
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyInfo {
    pub identity: Option<Vec<u8>>,
    pub nonce: Option<PartyNonce>,
    pub other: Option<Vec<u8>>,
}

impl PartyInfo {
    pub fn is_empty(&self) -> bool {
        self.identity.is_none() && self.nonce.is_none() && self.other.is_none()
    }

    fn to_value(&self) -> Value {
        let bytes = |b: &Option<Vec<u8>>| b.clone().map_or(Value::Null, Value::Bytes);
        let nonce = match &self.nonce {
            None => Value::Null,
            Some(PartyNonce::Bytes(b)) => Value::Bytes(b.clone()),
            Some(PartyNonce::Int(i)) => cbor::int(*i),
        };
        Value::Array(vec![bytes(&self.identity), nonce, bytes(&self.other)])
    }

    /// Place the fields into a recipient's unprotected header
    pub fn write_header(&self, header: &mut Header, labels: [i64; 3]) {
        if let Some(identity) = &self.identity {
            header.insert(labels[0], Value::Bytes(identity.clone()));
        }
        match &self.nonce {
            Some(PartyNonce::Bytes(b)) => {
                header.insert(labels[1], Value::Bytes(b.clone()));
            }
            Some(PartyNonce::Int(i)) => {
                header.insert(labels[1], cbor::int(*i));
            }
            None => {}
        }
        if let Some(other) = &self.other {
            header.insert(labels[2], Value::Bytes(other.clone()));
        }
    }

    /// Read the fields back from a recipient header
    pub fn read_header(header: &Header, labels: [i64; 3]) -> Result<Self, CoseError> {
        let nonce = match header.get(labels[1]) {
            None => None,
            Some(Value::Bytes(b)) => Some(PartyNonce::Bytes(b.clone())),
            Some(v) => Some(PartyNonce::Int(cbor::as_i64(v).ok_or_else(|| {
                CoseError::InvalidArgument(format!("nonce({}) should be bytes or int.", labels[1]))
            })?)),
        };
        Ok(PartyInfo {
            identity: header.bytes_param("identity", labels[0])?.map(<[u8]>::to_vec),
            nonce,
            other: header.bytes_param("other", labels[2])?.map(<[u8]>::to_vec),
        })
    }

    fn from_json(value: &Json, party: &str) -> Result<Self, CoseError> {
        let obj = value
            .as_object()
            .ok_or_else(|| arg(format!("{party} should be dict.")))?;
        let text = |field: &str| -> Result<Option<Vec<u8>>, CoseError> {
            match obj.get(field) {
                None | Some(Json::Null) => Ok(None),
                Some(Json::String(s)) => Ok(Some(s.as_bytes().to_vec())),
                Some(_) => Err(arg(format!("{party}.{field} should be str."))),
            }
        };
        let nonce = match obj.get("nonce") {
            None | Some(Json::Null) => None,
            Some(Json::String(s)) => Some(PartyNonce::Bytes(s.as_bytes().to_vec())),
            Some(Json::Number(n)) => Some(PartyNonce::Int(
                n.as_i64()
                    .ok_or_else(|| arg(format!("{party}.nonce should be str or int.")))?,
            )),
            Some(_) => return Err(arg(format!("{party}.nonce should be str or int."))),
        };
        Ok(PartyInfo {
            identity: text("identity")?,
            nonce,
            other: text("other")?,
        })
    }
}

/// Supplementary public information
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuppPubInfo {
    /// Checked for type on input, always replaced by the target key size
    pub key_data_length: Option<u64>,
    pub protected: Header,
    pub other: Option<Vec<u8>>,
}

/// Typed derivation context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KdfContext {
    /// Target algorithm of the derived key
    pub alg: Option<Algorithm>,
    pub party_u: PartyInfo,
    pub party_v: PartyInfo,
    pub supp_pub: SuppPubInfo,
}

impl KdfContext {
    pub fn new(alg: Algorithm) -> Self {
        KdfContext {
            alg: Some(alg),
            ..Self::default()
        }
    }

    /// Accept the loosely typed JSON form, e.g.
    /// `{"alg": "A128GCM", "party_u": {"identity": "lighting-client"}}`
    pub fn from_json(value: &Json) -> Result<Self, CoseError> {
        let obj = value
            .as_object()
            .ok_or_else(|| arg("context should be dict.".to_string()))?;

        let alg = match obj.get("alg") {
            None | Some(Json::Null) => None,
            Some(Json::String(name)) => Some(
                Algorithm::from_name(name)
                    .ok_or_else(|| arg(format!("Unsupported or unknown alg: {name}.")))?,
            ),
            Some(Json::Number(n)) => Some(Algorithm::new(
                n.as_i64().ok_or_else(|| arg("alg should be str or int.".to_string()))?,
            )),
            Some(_) => return Err(arg("alg should be str or int.".to_string())),
        };

        let party = |name: &str| match obj.get(name) {
            None | Some(Json::Null) => Ok(PartyInfo::default()),
            Some(v) => PartyInfo::from_json(v, name),
        };

        let mut supp_pub = SuppPubInfo::default();
        if let Some(sp) = obj.get("supp_pub").filter(|v| !v.is_null()) {
            let sp = sp
                .as_object()
                .ok_or_else(|| arg("supp_pub should be dict.".to_string()))?;
            supp_pub.key_data_length = match sp.get("key_data_length") {
                None | Some(Json::Null) => None,
                Some(v) => Some(
                    v.as_u64()
                        .ok_or_else(|| arg("supp_pub.key_data_length should be int.".to_string()))?,
                ),
            };
            if let Some(protected) = sp.get("protected").filter(|v| !v.is_null()) {
                supp_pub.protected = protected_from_json(protected)?;
            }
            supp_pub.other = match sp.get("other") {
                None | Some(Json::Null) => None,
                Some(Json::String(s)) => Some(s.as_bytes().to_vec()),
                Some(_) => return Err(arg("supp_pub.other should be str.".to_string())),
            };
        }

        Ok(KdfContext {
            alg,
            party_u: party("party_u")?,
            party_v: party("party_v")?,
            supp_pub,
        })
    }
}

fn protected_from_json(value: &Json) -> Result<Header, CoseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| arg("supp_pub.protected should be dict.".to_string()))?;
    let mut header = Header::new();
    for (k, v) in obj {
        let label: i64 = k
            .parse()
            .or_else(|_| if k == "alg" { Ok(label::ALG) } else { Err(()) })
            .map_err(|_| arg(format!("supp_pub.protected key {k} should be int.")))?;
        let value = match v {
            Json::Number(n) => cbor::int(
                n.as_i64()
                    .ok_or_else(|| arg(format!("supp_pub.protected[{k}] should be int.")))?,
            ),
            Json::String(s) if label == label::ALG => cbor::int(
                Algorithm::from_name(s)
                    .ok_or_else(|| arg(format!("Unsupported or unknown alg: {s}.")))?
                    .id(),
            ),
            Json::String(s) => Value::Text(s.clone()),
            _ => return Err(arg(format!("supp_pub.protected[{k}] should be int or str."))),
        };
        header.insert(label, value);
    }
    Ok(header)
}

fn arg(msg: String) -> CoseError {
    CoseError::InvalidArgument(msg)
}

/// Serialize the COSE_KDF_Context for a derivation targeting `alg`.
///
/// `alg` falls back to `context.alg`. When `recipient_alg` is given and differs
/// from the target, it replaces `alg` in the protected header carried by
/// SuppPubInfo.
pub fn build_context(
    context: &KdfContext,
    alg: Option<Algorithm>,
    recipient_alg: Option<Algorithm>,
) -> Result<Vec<u8>, CoseError> {
    let target = alg
        .or(context.alg)
        .ok_or_else(|| arg("alg should be specified.".to_string()))?;
    let spec = target.spec()?;
    if !matches!(
        spec.class,
        AlgorithmClass::Mac | AlgorithmClass::Aead | AlgorithmClass::KeyWrap
    ) {
        return Err(arg(format!("{target} cannot be the target of a key derivation.")));
    }

    let mut protected = context.supp_pub.protected.clone();
    if let Some(recipient_alg) = recipient_alg.filter(|r| *r != target) {
        protected.insert(label::ALG, cbor::int(recipient_alg.id()));
    }

    let mut supp_pub = vec![
        cbor::int(spec.key_bits() as i64),
        Value::Bytes(protected.to_protected_bytes()?),
    ];
    if let Some(other) = &context.supp_pub.other {
        supp_pub.push(Value::Bytes(other.clone()));
    }

    Ok(cbor::to_vec(&Value::Array(vec![
        cbor::int(target.id()),
        context.party_u.to_value(),
        context.party_v.to_value(),
        Value::Array(supp_pub),
    ]))?)
}

impl CoseKey {
    /// Derive a key for `context.alg` from this key's material
    pub fn derive_key(
        &self,
        salt: Option<&[u8]>,
        context: &KdfContext,
    ) -> Result<CoseKey, CoseError> {
        self.validate(KeyOp::DeriveKey)?;
        let Primitive::Hkdf(hkdf) = self.spec().primitive else {
            return Err(arg(format!("{} cannot derive keys", self.alg())));
        };
        let target = context
            .alg
            .ok_or_else(|| arg("alg should be specified.".to_string()))?;
        let info = build_context(context, Some(target), Some(self.alg()))?;

        let mut out = Zeroizing::new(vec![0u8; target.spec()?.key_len]);
        hkdf(self.key(), salt, &info, &mut out).map_err(|e| CoseError::encode("derive key", e))?;
        CoseKey::from_symmetric_key(&out, target, None)
            .map_err(|e| CoseError::encode("derive key", e))
    }

    /// Re-derive and compare against a key the sender asserts
    pub fn verify_key(
        &self,
        salt: Option<&[u8]>,
        expected: &[u8],
        context: &KdfContext,
    ) -> Result<(), CoseError> {
        let derived = self.derive_key(salt, context)?;
        if !ct_eq(derived.key(), expected) {
            return Err(CoseError::Verify("Failed to verify the derived key.".to_string()));
        }
        Ok(())
    }
}
