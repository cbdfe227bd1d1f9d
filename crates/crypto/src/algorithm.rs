//! Fixed algorithm registry
//!
//! Every supported COSE algorithm is one row in [`REGISTRY`]: its identifier,
//! class, key / nonce / tag lengths and the primitive functions it dispatches
//! to. Adding an algorithm means adding a row. Nothing here is computed at
//! runtime and the table cannot be extended by callers.

use std::fmt;

use sha2::{Sha256, Sha384, Sha512};

use crate::aead::{
    open_with, seal_with, Aes128Gcm, Aes192Gcm, Aes256Gcm, ChaCha20Poly1305, Ccm16_128_128,
    Ccm16_128_256, Ccm16_64_128, Ccm16_64_256, Ccm64_128_128, Ccm64_128_256, Ccm64_64_128,
    Ccm64_64_256,
};
use crate::error::KeyError;
use crate::hmac::hmac_with;
use crate::kdf::{hkdf_sha256, hkdf_sha512};
use crate::key::{Curve, KeyOp, KeyType};
use crate::key_wrap::{aes_kw_unwrap, aes_kw_wrap};
use crate::signature::{
    ed25519_generate, ed25519_public_key, ed25519_sign, ed25519_verify, es256_generate,
    es256_public_key, es256_sign, es256_verify, es384_generate, es384_public_key, es384_sign,
    es384_verify, es512_generate, es512_public_key, es512_sign, es512_verify,
};

pub type MacFn = fn(key: &[u8], msg: &[u8]) -> Result<Vec<u8>, String>;
pub type AeadFn = fn(key: &[u8], nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>, String>;
pub type WrapFn = fn(kek: &[u8], data: &[u8]) -> Result<Vec<u8>, String>;
pub type HkdfFn =
    fn(material: &[u8], salt: Option<&[u8]>, info: &[u8], out: &mut [u8]) -> Result<(), String>;
pub type SignFn = fn(private: &[u8], msg: &[u8]) -> Result<Vec<u8>, String>;
pub type VerifyFn = fn(public: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), String>;
pub type PublicKeyFn = fn(private: &[u8]) -> Result<Vec<u8>, String>;
pub type GenerateFn = fn() -> Vec<u8>;

/// COSE algorithm identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Algorithm(i64);

impl Algorithm {
    pub const A128GCM: Self = Self(1);
    pub const A192GCM: Self = Self(2);
    pub const A256GCM: Self = Self(3);
    pub const HMAC_256_64: Self = Self(4);
    pub const HMAC_256_256: Self = Self(5);
    pub const HMAC_384_384: Self = Self(6);
    pub const HMAC_512_512: Self = Self(7);
    pub const AES_CCM_16_64_128: Self = Self(10);
    pub const AES_CCM_16_64_256: Self = Self(11);
    pub const AES_CCM_64_64_128: Self = Self(12);
    pub const AES_CCM_64_64_256: Self = Self(13);
    pub const CHACHA20_POLY1305: Self = Self(24);
    pub const AES_CCM_16_128_128: Self = Self(30);
    pub const AES_CCM_16_128_256: Self = Self(31);
    pub const AES_CCM_64_128_128: Self = Self(32);
    pub const AES_CCM_64_128_256: Self = Self(33);
    pub const A128KW: Self = Self(-3);
    pub const A192KW: Self = Self(-4);
    pub const A256KW: Self = Self(-5);
    pub const DIRECT: Self = Self(-6);
    pub const ES256: Self = Self(-7);
    pub const EDDSA: Self = Self(-8);
    pub const DIRECT_HKDF_SHA_256: Self = Self(-10);
    pub const DIRECT_HKDF_SHA_512: Self = Self(-11);
    pub const ES384: Self = Self(-35);
    pub const ES512: Self = Self(-36);

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn id(self) -> i64 {
        self.0
    }

    /// Look up the registry row for this identifier
    pub fn spec(self) -> Result<&'static AlgorithmSpec, KeyError> {
        REGISTRY
            .iter()
            .find(|spec| spec.alg == self)
            .ok_or(KeyError::UnsupportedAlgorithm(self.0))
    }

    /// Resolve a registered name such as `"AES-CCM-16-64-128"`
    pub fn from_name(name: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.alg)
    }

    /// Every registered algorithm, in registry order
    pub fn all() -> impl Iterator<Item = Algorithm> {
        REGISTRY.iter().map(|spec| spec.alg)
    }
}

impl From<i64> for Algorithm {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.spec() {
            Ok(spec) => write!(f, "{}({})", spec.name, self.0),
            Err(_) => write!(f, "alg({})", self.0),
        }
    }
}

/// Broad family an algorithm belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmClass {
    Mac,
    Aead,
    KeyWrap,
    /// The recipient already holds the content key
    Direct,
    KeyDerivation,
    Signature,
}

impl AlgorithmClass {
    /// Operations a key of this class may ever be permitted
    pub fn legal_ops(self) -> &'static [KeyOp] {
        match self {
            AlgorithmClass::Mac => &[KeyOp::MacCreate, KeyOp::MacVerify],
            AlgorithmClass::Aead => &[
                KeyOp::Encrypt,
                KeyOp::Decrypt,
                KeyOp::WrapKey,
                KeyOp::UnwrapKey,
            ],
            AlgorithmClass::KeyWrap => &[KeyOp::WrapKey, KeyOp::UnwrapKey],
            AlgorithmClass::Direct => &[],
            AlgorithmClass::KeyDerivation => &[KeyOp::DeriveKey, KeyOp::DeriveBits],
            AlgorithmClass::Signature => &[KeyOp::Sign, KeyOp::Verify],
        }
    }
}

/// Primitive dispatch entry of a registry row
#[derive(Clone, Copy)]
pub(crate) enum Primitive {
    Mac(MacFn),
    Aead {
        seal: AeadFn,
        open: AeadFn,
    },
    KeyWrap {
        wrap: WrapFn,
        unwrap: WrapFn,
    },
    Direct,
    Hkdf(HkdfFn),
    Signature {
        curve: Curve,
        sign: SignFn,
        verify: VerifyFn,
        public_key: PublicKeyFn,
        generate: GenerateFn,
    },
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Primitive::Mac(_) => "Mac",
            Primitive::Aead { .. } => "Aead",
            Primitive::KeyWrap { .. } => "KeyWrap",
            Primitive::Direct => "Direct",
            Primitive::Hkdf(_) => "Hkdf",
            Primitive::Signature { .. } => "Signature",
        };
        f.write_str(name)
    }
}

/// Policy and dispatch for one algorithm identifier
#[derive(Debug)]
pub struct AlgorithmSpec {
    pub alg: Algorithm,
    pub name: &'static str,
    pub class: AlgorithmClass,
    /// Required key or private scalar length in bytes. Zero for derivation
    /// material, which may be any non-empty length.
    pub key_len: usize,
    /// Required nonce length in bytes (AEAD only)
    pub nonce_len: usize,
    /// Authentication tag length in bytes (MAC truncation or AEAD tag)
    pub tag_len: usize,
    pub(crate) primitive: Primitive,
}

impl AlgorithmSpec {
    /// Key length in bits, as carried in the KDF context
    pub fn key_bits(&self) -> u64 {
        (self.key_len as u64) * 8
    }

    /// Curve of a signature algorithm
    pub fn curve(&self) -> Option<Curve> {
        match self.primitive {
            Primitive::Signature { curve, .. } => Some(curve),
            _ => None,
        }
    }

    /// Key type a descriptor for this algorithm must carry
    pub fn key_type(&self) -> KeyType {
        self.curve().map_or(KeyType::Symmetric, Curve::key_type)
    }
}

macro_rules! aead_row {
    ($alg:expr, $name:expr, $cipher:ty, $key:expr, $nonce:expr, $tag:expr) => {
        AlgorithmSpec {
            alg: $alg,
            name: $name,
            class: AlgorithmClass::Aead,
            key_len: $key,
            nonce_len: $nonce,
            tag_len: $tag,
            primitive: Primitive::Aead {
                seal: seal_with::<$cipher>,
                open: open_with::<$cipher>,
            },
        }
    };
}

macro_rules! mac_row {
    ($alg:expr, $name:expr, $digest:ty, $key:expr, $tag:expr) => {
        AlgorithmSpec {
            alg: $alg,
            name: $name,
            class: AlgorithmClass::Mac,
            key_len: $key,
            nonce_len: 0,
            tag_len: $tag,
            primitive: Primitive::Mac(hmac_with::<$digest>),
        }
    };
}

macro_rules! signature_row {
    ($alg:expr, $name:expr, $curve:expr, $key:expr, $sig:expr,
     [$sign:expr, $verify:expr, $public_key:expr, $generate:expr]) => {
        AlgorithmSpec {
            alg: $alg,
            name: $name,
            class: AlgorithmClass::Signature,
            key_len: $key,
            nonce_len: 0,
            tag_len: $sig,
            primitive: Primitive::Signature {
                curve: $curve,
                sign: $sign,
                verify: $verify,
                public_key: $public_key,
                generate: $generate,
            },
        }
    };
}

macro_rules! key_wrap_row {
    ($alg:expr, $name:expr, $key:expr) => {
        AlgorithmSpec {
            alg: $alg,
            name: $name,
            class: AlgorithmClass::KeyWrap,
            key_len: $key,
            nonce_len: 0,
            tag_len: 8,
            primitive: Primitive::KeyWrap {
                wrap: aes_kw_wrap,
                unwrap: aes_kw_unwrap,
            },
        }
    };
}

static REGISTRY: [AlgorithmSpec; 26] = [
    aead_row!(Algorithm::A128GCM, "A128GCM", Aes128Gcm, 16, 12, 16),
    aead_row!(Algorithm::A192GCM, "A192GCM", Aes192Gcm, 24, 12, 16),
    aead_row!(Algorithm::A256GCM, "A256GCM", Aes256Gcm, 32, 12, 16),
    mac_row!(Algorithm::HMAC_256_64, "HMAC 256/64", Sha256, 32, 8),
    mac_row!(Algorithm::HMAC_256_256, "HMAC 256/256", Sha256, 32, 32),
    mac_row!(Algorithm::HMAC_384_384, "HMAC 384/384", Sha384, 48, 48),
    mac_row!(Algorithm::HMAC_512_512, "HMAC 512/512", Sha512, 64, 64),
    aead_row!(Algorithm::AES_CCM_16_64_128, "AES-CCM-16-64-128", Ccm16_64_128, 16, 13, 8),
    aead_row!(Algorithm::AES_CCM_16_64_256, "AES-CCM-16-64-256", Ccm16_64_256, 32, 13, 8),
    aead_row!(Algorithm::AES_CCM_64_64_128, "AES-CCM-64-64-128", Ccm64_64_128, 16, 7, 8),
    aead_row!(Algorithm::AES_CCM_64_64_256, "AES-CCM-64-64-256", Ccm64_64_256, 32, 7, 8),
    aead_row!(Algorithm::CHACHA20_POLY1305, "ChaCha20/Poly1305", ChaCha20Poly1305, 32, 12, 16),
    aead_row!(Algorithm::AES_CCM_16_128_128, "AES-CCM-16-128-128", Ccm16_128_128, 16, 13, 16),
    aead_row!(Algorithm::AES_CCM_16_128_256, "AES-CCM-16-128-256", Ccm16_128_256, 32, 13, 16),
    aead_row!(Algorithm::AES_CCM_64_128_128, "AES-CCM-64-128-128", Ccm64_128_128, 16, 7, 16),
    aead_row!(Algorithm::AES_CCM_64_128_256, "AES-CCM-64-128-256", Ccm64_128_256, 32, 7, 16),
    key_wrap_row!(Algorithm::A128KW, "A128KW", 16),
    key_wrap_row!(Algorithm::A192KW, "A192KW", 24),
    key_wrap_row!(Algorithm::A256KW, "A256KW", 32),
    AlgorithmSpec {
        alg: Algorithm::DIRECT,
        name: "direct",
        class: AlgorithmClass::Direct,
        key_len: 0,
        nonce_len: 0,
        tag_len: 0,
        primitive: Primitive::Direct,
    },
    signature_row!(Algorithm::ES256, "ES256", Curve::P256, 32, 64,
        [es256_sign, es256_verify, es256_public_key, es256_generate]),
    signature_row!(Algorithm::EDDSA, "EdDSA", Curve::Ed25519, 32, 64,
        [ed25519_sign, ed25519_verify, ed25519_public_key, ed25519_generate]),
    AlgorithmSpec {
        alg: Algorithm::DIRECT_HKDF_SHA_256,
        name: "direct+HKDF-SHA-256",
        class: AlgorithmClass::KeyDerivation,
        key_len: 0,
        nonce_len: 0,
        tag_len: 0,
        primitive: Primitive::Hkdf(hkdf_sha256),
    },
    AlgorithmSpec {
        alg: Algorithm::DIRECT_HKDF_SHA_512,
        name: "direct+HKDF-SHA-512",
        class: AlgorithmClass::KeyDerivation,
        key_len: 0,
        nonce_len: 0,
        tag_len: 0,
        primitive: Primitive::Hkdf(hkdf_sha512),
    },
    signature_row!(Algorithm::ES384, "ES384", Curve::P384, 48, 96,
        [es384_sign, es384_verify, es384_public_key, es384_generate]),
    signature_row!(Algorithm::ES512, "ES512", Curve::P521, 66, 132,
        [es512_sign, es512_verify, es512_public_key, es512_generate]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id_and_name() {
        let spec = Algorithm::AES_CCM_64_128_256.spec().unwrap();
        assert_eq!(spec.name, "AES-CCM-64-128-256");
        assert_eq!((spec.key_len, spec.nonce_len, spec.tag_len), (32, 7, 16));
        assert_eq!(
            Algorithm::from_name("HMAC 256/64"),
            Some(Algorithm::HMAC_256_64)
        );
        assert_eq!(Algorithm::from_name("HS256"), None);
    }

    #[test]
    fn test_unknown_algorithm() {
        assert!(matches!(
            Algorithm::new(-65535).spec(),
            Err(KeyError::UnsupportedAlgorithm(-65535))
        ));
        assert_eq!(Algorithm::new(0).to_string(), "alg(0)");
    }

    #[test]
    fn test_registry_ids_are_unique() {
        let ids: Vec<i64> = Algorithm::all().map(Algorithm::id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids.len(), sorted.len());
    }

    #[test]
    fn test_aead_rows_have_nonce_and_tag() {
        for alg in Algorithm::all() {
            let spec = alg.spec().unwrap();
            if spec.class == AlgorithmClass::Aead {
                assert!(matches!(spec.nonce_len, 7 | 12 | 13), "{alg}");
                assert!(matches!(spec.tag_len, 8 | 16), "{alg}");
            }
        }
    }

    #[test]
    fn test_signature_rows_carry_their_curve() {
        let cases = [
            (Algorithm::ES256, Curve::P256, KeyType::Ec2),
            (Algorithm::ES384, Curve::P384, KeyType::Ec2),
            (Algorithm::ES512, Curve::P521, KeyType::Ec2),
            (Algorithm::EDDSA, Curve::Ed25519, KeyType::Okp),
        ];
        for (alg, curve, kty) in cases {
            let spec = alg.spec().unwrap();
            assert_eq!(spec.curve(), Some(curve), "{alg}");
            assert_eq!(spec.key_type(), kty, "{alg}");
        }
        assert_eq!(Algorithm::from_name("EdDSA"), Some(Algorithm::EDDSA));
        assert_eq!(Algorithm::A128KW.spec().unwrap().key_type(), KeyType::Symmetric);
        assert_eq!(Algorithm::DIRECT_HKDF_SHA_512.spec().unwrap().curve(), None);
    }

    #[test]
    fn test_key_bits() {
        assert_eq!(Algorithm::A192KW.spec().unwrap().key_bits(), 192);
        assert_eq!(Algorithm::HMAC_512_512.spec().unwrap().key_bits(), 512);
    }
}
