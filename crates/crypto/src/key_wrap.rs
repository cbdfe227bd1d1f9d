//! AES key wrap (RFC 3394)

use aes::cipher::generic_array::GenericArray;
use aes_kw::{KekAes128, KekAes192, KekAes256};

use crate::algorithm::{Algorithm, Primitive};
use crate::error::CoseError;
use crate::key::{CoseKey, KeyOp};

pub fn aes_kw_wrap(kek: &[u8], data: &[u8]) -> Result<Vec<u8>, String> {
    let wrapped = match kek.len() {
        16 => KekAes128::new(GenericArray::from_slice(kek)).wrap_vec(data),
        24 => KekAes192::new(GenericArray::from_slice(kek)).wrap_vec(data),
        32 => KekAes256::new(GenericArray::from_slice(kek)).wrap_vec(data),
        n => return Err(format!("unsupported key-encryption key length {n}")),
    };
    wrapped.map_err(|e| e.to_string())
}

pub fn aes_kw_unwrap(kek: &[u8], data: &[u8]) -> Result<Vec<u8>, String> {
    let unwrapped = match kek.len() {
        16 => KekAes128::new(GenericArray::from_slice(kek)).unwrap_vec(data),
        24 => KekAes192::new(GenericArray::from_slice(kek)).unwrap_vec(data),
        32 => KekAes256::new(GenericArray::from_slice(kek)).unwrap_vec(data),
        n => return Err(format!("unsupported key-encryption key length {n}")),
    };
    unwrapped.map_err(|e| e.to_string())
}

impl CoseKey {
    /// Wrap raw key bytes under this key-encryption key
    pub fn wrap_key(&self, key_to_wrap: &[u8]) -> Result<Vec<u8>, CoseError> {
        self.validate(KeyOp::WrapKey)?;
        let Primitive::KeyWrap { wrap, .. } = self.spec().primitive else {
            return Err(CoseError::InvalidArgument(format!(
                "{} cannot wrap keys",
                self.alg()
            )));
        };
        wrap(self.key(), key_to_wrap).map_err(|e| CoseError::encode("wrap key", e))
    }

    /// Recover a wrapped key as a fresh descriptor for `alg`.
    ///
    /// The wrapping key is left untouched.
    pub fn unwrap_key(&self, wrapped: &[u8], alg: Algorithm) -> Result<CoseKey, CoseError> {
        self.validate(KeyOp::UnwrapKey)?;
        let Primitive::KeyWrap { unwrap, .. } = self.spec().primitive else {
            return Err(CoseError::InvalidArgument(format!(
                "{} cannot unwrap keys",
                self.alg()
            )));
        };
        let raw = zeroize::Zeroizing::new(
            unwrap(self.key(), wrapped).map_err(|e| CoseError::decode("unwrap key", e))?,
        );
        CoseKey::from_symmetric_key(&raw, alg, None).map_err(|e| CoseError::decode("unwrap key", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc3394_vector() {
        // RFC 3394 4.1: 128-bit KEK wrapping 128 bits of key data
        let kek: Vec<u8> = (0x00..=0x0f).collect();
        let data = [
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee, 0xff,
        ];
        let expected = [
            0x1f, 0xa6, 0x8b, 0x0a, 0x81, 0x12, 0xb4, 0x47, 0xae, 0xf3, 0x4b, 0xd8, 0xfb, 0x5a,
            0x7b, 0x82, 0x9d, 0x3e, 0x86, 0x23, 0x71, 0xd2, 0xcf, 0xe5,
        ];
        assert_eq!(aes_kw_wrap(&kek, &data).unwrap(), expected);
        assert_eq!(aes_kw_unwrap(&kek, &expected).unwrap(), data);
    }

    #[test]
    fn test_wrap_unwrap_descriptor() {
        let kek = CoseKey::generate(Algorithm::A192KW).unwrap();
        let cek = CoseKey::generate(Algorithm::A256GCM).unwrap();
        let wrapped = kek.wrap_key(cek.key()).unwrap();
        assert_eq!(wrapped.len(), 40);

        let recovered = kek.unwrap_key(&wrapped, Algorithm::A256GCM).unwrap();
        assert_eq!(recovered.key(), cek.key());
        assert_eq!(recovered.alg(), Algorithm::A256GCM);
        assert_eq!(kek.key().len(), 24);
    }

    #[test]
    fn test_unwrap_failures_are_decode_errors() {
        let kek = CoseKey::generate(Algorithm::A128KW).unwrap();
        let other = CoseKey::generate(Algorithm::A128KW).unwrap();
        let wrapped = kek.wrap_key(&[5u8; 16]).unwrap();

        assert!(other.unwrap_key(&wrapped, Algorithm::A128GCM).unwrap_err().is_decode_error());
        // integrity ok, but 16 bytes is the wrong size for A256GCM
        assert!(kek.unwrap_key(&wrapped, Algorithm::A256GCM).unwrap_err().is_decode_error());
    }

    #[test]
    fn test_non_wrap_key_rejected() {
        let key = CoseKey::generate(Algorithm::HMAC_256_256).unwrap();
        assert!(key.wrap_key(&[0u8; 16]).unwrap_err().is_argument_error());
    }
}
