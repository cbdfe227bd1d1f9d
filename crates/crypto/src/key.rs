//! Key descriptors
//!
//! A [`CoseKey`] binds raw key material to one registry algorithm and a set of
//! permitted operations. Construction runs in two passes:
//!
//! 1. `normalize` fills defaults: key operations, missing symmetric or private
//!    material, and the public point of a signature private key
//! 2. `check_invariants` enforces key type, operation subset, material length
//!    and public/private consistency
//!
//! A descriptor never changes after construction.

use std::fmt;

use ciborium::Value;
use cwt_protocol::cbor;

use crate::algorithm::{Algorithm, AlgorithmClass, AlgorithmSpec, Primitive};
use crate::error::{CoseError, KeyError};
use crate::types::SecretBytes;

/// COSE_Key map labels
pub mod label {
    pub const KTY: i64 = 1;
    pub const KID: i64 = 2;
    pub const ALG: i64 = 3;
    pub const KEY_OPS: i64 = 4;

    /// Symmetric key value
    pub const K: i64 = -1;

    // EC2 and OKP
    pub const CRV: i64 = -1;
    pub const X: i64 = -2;
    pub const Y: i64 = -3;
    pub const D: i64 = -4;
}

/// COSE elliptic curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    P256 = 1,
    P384 = 2,
    P521 = 3,
    Ed25519 = 6,
}

impl Curve {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Curve::P256),
            2 => Some(Curve::P384),
            3 => Some(Curve::P521),
            6 => Some(Curve::Ed25519),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn key_type(self) -> KeyType {
        match self {
            Curve::Ed25519 => KeyType::Okp,
            _ => KeyType::Ec2,
        }
    }

    /// Width of one coordinate (and of the private scalar)
    pub fn coordinate_len(self) -> usize {
        match self {
            Curve::P256 | Curve::Ed25519 => 32,
            Curve::P384 => 48,
            Curve::P521 => 66,
        }
    }
}

/// COSE key type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Okp = 1,
    Ec2 = 2,
    Symmetric = 4,
}

impl KeyType {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(KeyType::Okp),
            2 => Some(KeyType::Ec2),
            4 => Some(KeyType::Symmetric),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        self as i64
    }
}

/// COSE key operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyOp {
    Sign = 1,
    Verify = 2,
    Encrypt = 3,
    Decrypt = 4,
    WrapKey = 5,
    UnwrapKey = 6,
    DeriveKey = 7,
    DeriveBits = 8,
    MacCreate = 9,
    MacVerify = 10,
}

impl KeyOp {
    pub fn from_i64(value: i64) -> Option<Self> {
        let op = match value {
            1 => KeyOp::Sign,
            2 => KeyOp::Verify,
            3 => KeyOp::Encrypt,
            4 => KeyOp::Decrypt,
            5 => KeyOp::WrapKey,
            6 => KeyOp::UnwrapKey,
            7 => KeyOp::DeriveKey,
            8 => KeyOp::DeriveBits,
            9 => KeyOp::MacCreate,
            10 => KeyOp::MacVerify,
            _ => return None,
        };
        Some(op)
    }

    pub fn id(self) -> i64 {
        self as i64
    }
}

impl fmt::Display for KeyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyOp::Sign => "sign",
            KeyOp::Verify => "verify",
            KeyOp::Encrypt => "encrypt",
            KeyOp::Decrypt => "decrypt",
            KeyOp::WrapKey => "wrap key",
            KeyOp::UnwrapKey => "unwrap key",
            KeyOp::DeriveKey => "derive key",
            KeyOp::DeriveBits => "derive bits",
            KeyOp::MacCreate => "MAC create",
            KeyOp::MacVerify => "MAC verify",
        };
        f.write_str(name)
    }
}

/// Raw, unchecked input to [`CoseKey::new`]
#[derive(Debug, Clone)]
pub struct KeyParams {
    pub kty: i64,
    pub alg: Option<i64>,
    pub kid: Option<Vec<u8>>,
    /// Empty means every operation legal for the algorithm class
    pub key_ops: Vec<i64>,
    /// Symmetric key or private scalar. `None` generates fresh material.
    pub k: Option<Vec<u8>>,
    /// Uncompressed SEC1 point for EC2 keys, raw point for OKP keys
    pub public: Option<Vec<u8>>,
}

impl Default for KeyParams {
    fn default() -> Self {
        KeyParams {
            kty: KeyType::Symmetric.id(),
            alg: None,
            kid: None,
            key_ops: Vec::new(),
            k: None,
            public: None,
        }
    }
}

/// Capability-tagged key descriptor
#[derive(Debug, Clone)]
pub struct CoseKey {
    kty: KeyType,
    spec: &'static AlgorithmSpec,
    kid: Option<Vec<u8>>,
    key_ops: Vec<KeyOp>,
    material: SecretBytes,
    public: Option<Vec<u8>>,
}

impl CoseKey {
    /// Build a descriptor, generating material when none is supplied
    pub fn new(params: KeyParams) -> Result<Self, KeyError> {
        let key = Self::normalize(params)?;
        key.check_invariants()?;
        Ok(key)
    }

    /// Import raw symmetric key bytes for `alg`
    pub fn from_symmetric_key(
        key: &[u8],
        alg: Algorithm,
        kid: Option<&[u8]>,
    ) -> Result<Self, KeyError> {
        Self::new(KeyParams {
            kty: alg.spec()?.key_type().id(),
            alg: Some(alg.id()),
            kid: kid.map(<[u8]>::to_vec),
            k: Some(key.to_vec()),
            ..KeyParams::default()
        })
    }

    /// Fresh random key for `alg`
    pub fn generate(alg: Algorithm) -> Result<Self, KeyError> {
        Self::new(KeyParams {
            kty: alg.spec()?.key_type().id(),
            alg: Some(alg.id()),
            ..KeyParams::default()
        })
    }

    pub fn with_kid(mut self, kid: impl Into<Vec<u8>>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    fn normalize(params: KeyParams) -> Result<Self, KeyError> {
        let kty = KeyType::from_i64(params.kty).ok_or(KeyError::UnknownKeyType(params.kty))?;
        let alg = params.alg.ok_or(KeyError::MissingAlgorithm)?;
        let spec = Algorithm::new(alg).spec()?;

        let mut key_ops = params
            .key_ops
            .iter()
            .map(|&op| KeyOp::from_i64(op).ok_or(KeyError::UnknownOperation(op)))
            .collect::<Result<Vec<_>, _>>()?;

        let public_only = params.k.is_none() && params.public.is_some();
        if key_ops.is_empty() {
            key_ops = if spec.class == AlgorithmClass::Signature && public_only {
                vec![KeyOp::Verify]
            } else {
                spec.class.legal_ops().to_vec()
            };
        }

        let material = match (params.k, &spec.primitive) {
            (Some(k), _) => SecretBytes::from_slice(&k),
            (None, _)
                if matches!(spec.class, AlgorithmClass::Direct | AlgorithmClass::KeyDerivation)
                    || public_only =>
            {
                SecretBytes::default()
            }
            (None, Primitive::Signature { generate, .. }) => SecretBytes::from_slice(&generate()),
            (None, _) => SecretBytes::random(spec.key_len),
        };

        let public = match (params.public, &spec.primitive) {
            (Some(public), _) => Some(public),
            (None, Primitive::Signature { public_key, .. }) if !material.is_empty() => {
                Some(public_key(material.as_slice()).map_err(KeyError::InvalidKey)?)
            }
            (None, _) => None,
        };

        Ok(CoseKey {
            kty,
            spec,
            kid: params.kid,
            key_ops,
            material,
            public,
        })
    }

    fn check_invariants(&self) -> Result<(), KeyError> {
        let class = self.spec.class;
        if class == AlgorithmClass::Direct {
            return Err(KeyError::InvalidKey(format!(
                "{} does not take a key",
                self.spec.alg
            )));
        }
        if self.spec.key_type() != self.kty {
            return Err(KeyError::KeyTypeMismatch {
                kty: self.kty.id(),
                alg: self.spec.alg.id(),
            });
        }
        if let Some(&op) = self.key_ops.iter().find(|op| !class.legal_ops().contains(op)) {
            return Err(KeyError::IllegalOperation {
                op,
                alg: self.spec.alg.id(),
            });
        }

        if let Primitive::Signature { public_key, .. } = self.spec.primitive {
            if self.material.is_empty() {
                if self.public.is_none() {
                    return Err(KeyError::MissingMaterial);
                }
                if self.key_ops.contains(&KeyOp::Sign) {
                    return Err(KeyError::IllegalOperation {
                        op: KeyOp::Sign,
                        alg: self.spec.alg.id(),
                    });
                }
                return Ok(());
            }
            let derived = public_key(self.material.as_slice()).map_err(KeyError::InvalidKey)?;
            if self.public.as_deref() != Some(derived.as_slice()) {
                return Err(KeyError::InvalidKey(
                    "public point does not match the private key".to_string(),
                ));
            }
        }

        if class == AlgorithmClass::KeyDerivation {
            if self.material.is_empty() {
                return Err(KeyError::MissingMaterial);
            }
            return Ok(());
        }
        if self.material.len() != self.spec.key_len {
            return Err(KeyError::InvalidLength {
                expected: self.spec.key_len,
                got: self.material.len(),
            });
        }
        Ok(())
    }

    /// Fail unless `op` is among the permitted operations
    pub fn validate(&self, op: KeyOp) -> Result<(), KeyError> {
        if self.key_ops.contains(&op) {
            Ok(())
        } else {
            Err(KeyError::OperationNotPermitted(op))
        }
    }

    pub fn kty(&self) -> KeyType {
        self.kty
    }

    pub fn alg(&self) -> Algorithm {
        self.spec.alg
    }

    pub fn spec(&self) -> &'static AlgorithmSpec {
        self.spec
    }

    pub fn kid(&self) -> Option<&[u8]> {
        self.kid.as_deref()
    }

    pub fn key_ops(&self) -> &[KeyOp] {
        &self.key_ops
    }

    /// Raw symmetric key or private scalar (empty for public-only keys)
    pub fn key(&self) -> &[u8] {
        self.material.as_slice()
    }

    /// Public point of a signature key: uncompressed SEC1 for EC2, raw for OKP
    pub fn public_bytes(&self) -> Option<&[u8]> {
        self.public.as_deref()
    }

    /// Verify-only copy of a signature key
    pub fn public_key(&self) -> Result<CoseKey, KeyError> {
        let public = self
            .public
            .clone()
            .ok_or_else(|| KeyError::InvalidKey("key has no public part".to_string()))?;
        Ok(CoseKey {
            kty: self.kty,
            spec: self.spec,
            kid: self.kid.clone(),
            key_ops: vec![KeyOp::Verify],
            material: SecretBytes::default(),
            public: Some(public),
        })
    }

    /// Parse a COSE_Key map
    pub fn from_cose_map(value: &Value) -> Result<Self, KeyError> {
        let entries = value
            .as_map()
            .ok_or_else(|| KeyError::InvalidKey("COSE_Key should be a map.".to_string()))?;
        let get = |label: i64| {
            entries
                .iter()
                .find(|(k, _)| cbor::as_i64(k) == Some(label))
                .map(|(_, v)| v)
        };
        let int = |name: &str, label: i64| -> Result<Option<i64>, KeyError> {
            get(label)
                .map(|v| {
                    cbor::as_i64(v)
                        .ok_or_else(|| KeyError::InvalidKey(format!("{name}({label}) should be int.")))
                })
                .transpose()
        };
        let bytes = |name: &str, label: i64| -> Result<Option<Vec<u8>>, KeyError> {
            get(label)
                .map(|v| {
                    cbor::as_bytes(v).map(<[u8]>::to_vec).ok_or_else(|| {
                        KeyError::InvalidKey(format!("{name}({label}) should be bytes."))
                    })
                })
                .transpose()
        };

        let kty = int("kty", label::KTY)?
            .ok_or_else(|| KeyError::InvalidKey("kty(1) not found.".to_string()))?;
        let alg = match get(label::ALG) {
            Some(Value::Text(name)) => Some(
                Algorithm::from_name(name)
                    .ok_or_else(|| KeyError::InvalidKey(format!("Unsupported or unknown alg(3): {name}.")))?
                    .id(),
            ),
            _ => int("alg", label::ALG)?,
        };
        let key_ops = match get(label::KEY_OPS) {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    cbor::as_i64(v).ok_or_else(|| {
                        KeyError::InvalidKey("key_ops(4) should be a list of int.".to_string())
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(KeyError::InvalidKey(
                    "key_ops(4) should be list.".to_string(),
                ))
            }
        };

        let mut params = KeyParams {
            kty,
            alg,
            kid: bytes("kid", label::KID)?,
            key_ops,
            ..KeyParams::default()
        };

        match KeyType::from_i64(kty) {
            Some(KeyType::Symmetric) => {
                params.k = bytes("k", label::K)?;
            }
            Some(kty @ (KeyType::Ec2 | KeyType::Okp)) => {
                let crv = int("crv", label::CRV)?
                    .ok_or_else(|| KeyError::InvalidKey("crv(-1) not found.".to_string()))?;
                let curve = Curve::from_i64(crv)
                    .filter(|curve| curve.key_type() == kty)
                    .ok_or_else(|| KeyError::InvalidKey(format!("Unsupported crv: {crv}.")))?;
                let expected = alg.map(Algorithm::new).map(Algorithm::spec).transpose()?;
                if let Some(spec) = expected.filter(|spec| spec.curve() != Some(curve)) {
                    return Err(KeyError::InvalidKey(format!(
                        "crv(-1) {crv} does not match {}.",
                        spec.alg
                    )));
                }
                params.k = bytes("d", label::D)?;
                if kty == KeyType::Okp {
                    params.public = bytes("x", label::X)?;
                    return Self::new(params);
                }
                let x = bytes("x", label::X)?;
                let y = bytes("y", label::Y)?;
                params.public = match (x, y) {
                    (Some(x), Some(y)) => {
                        let mut point = Vec::with_capacity(1 + x.len() + y.len());
                        point.push(0x04);
                        point.extend_from_slice(&x);
                        point.extend_from_slice(&y);
                        Some(point)
                    }
                    (None, None) => None,
                    _ => {
                        return Err(KeyError::InvalidKey(
                            "x(-2) and y(-3) should appear together.".to_string(),
                        ))
                    }
                };
            }
            _ => return Err(KeyError::UnknownKeyType(kty)),
        }

        Self::new(params)
    }

    /// Export as a COSE_Key map, including private material
    pub fn to_cose_map(&self) -> Value {
        let mut entries = vec![
            (cbor::int(label::KTY), cbor::int(self.kty.id())),
            (cbor::int(label::ALG), cbor::int(self.spec.alg.id())),
        ];
        if let Some(kid) = &self.kid {
            entries.push((cbor::int(label::KID), Value::Bytes(kid.clone())));
        }
        entries.push((
            cbor::int(label::KEY_OPS),
            Value::Array(self.key_ops.iter().map(|op| cbor::int(op.id())).collect()),
        ));

        let Some(curve) = self.spec.curve() else {
            entries.push((cbor::int(label::K), Value::Bytes(self.key().to_vec())));
            return Value::Map(entries);
        };
        entries.push((cbor::int(label::CRV), cbor::int(curve.id())));
        let width = curve.coordinate_len();
        match (self.kty, self.public.as_deref()) {
            (KeyType::Okp, Some(point)) => {
                entries.push((cbor::int(label::X), Value::Bytes(point.to_vec())));
            }
            (KeyType::Ec2, Some(point)) if point.len() == 1 + 2 * width => {
                entries.push((cbor::int(label::X), Value::Bytes(point[1..1 + width].to_vec())));
                entries.push((cbor::int(label::Y), Value::Bytes(point[1 + width..].to_vec())));
            }
            _ => {}
        }
        if !self.material.is_empty() {
            entries.push((cbor::int(label::D), Value::Bytes(self.key().to_vec())));
        }
        Value::Map(entries)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CoseError> {
        Ok(cbor::to_vec(&self.to_cose_map())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoseError> {
        Ok(Self::from_cose_map(&cbor::from_slice(bytes)?)?)
    }
}
