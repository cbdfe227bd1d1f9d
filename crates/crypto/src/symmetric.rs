//! Symmetric algorithm suite: MAC and AEAD
//!
//! Length policy lives here, not in the primitives. A wrong-length nonce is an
//! argument error raised before the cipher is touched; every primitive failure
//! while opening, including a tag mismatch, is reported as one decode error.

use crate::algorithm::Primitive;
use crate::error::CoseError;
use crate::helpers::{ct_eq, random_bytes};
use crate::key::{CoseKey, KeyOp};

impl CoseKey {
    /// Keyed digest truncated to the algorithm's tag length
    pub fn mac(&self, msg: &[u8]) -> Result<Vec<u8>, CoseError> {
        self.validate(KeyOp::MacCreate)?;
        self.compute_mac(msg)
    }

    /// Recompute the tag and compare in constant time
    pub fn verify_mac(&self, msg: &[u8], tag: &[u8]) -> Result<(), CoseError> {
        self.validate(KeyOp::MacVerify)?;
        let expected = self.compute_mac(msg)?;
        if !ct_eq(&expected, tag) {
            return Err(CoseError::Verify("Failed to compare digest.".to_string()));
        }
        Ok(())
    }

    fn compute_mac(&self, msg: &[u8]) -> Result<Vec<u8>, CoseError> {
        let Primitive::Mac(mac) = self.spec().primitive else {
            return Err(CoseError::InvalidArgument(format!(
                "{} is not a MAC algorithm",
                self.alg()
            )));
        };
        let mut tag = mac(self.key(), msg).map_err(|e| CoseError::encode("compute MAC", e))?;
        tag.truncate(self.spec().tag_len);
        Ok(tag)
    }

    /// Random nonce of the exact length the algorithm requires
    pub fn generate_nonce(&self) -> Result<Vec<u8>, CoseError> {
        self.aead_nonce_len()?;
        Ok(random_bytes(self.spec().nonce_len))
    }

    /// Authenticated encryption; the tag is appended to the ciphertext
    pub fn seal(
        &self,
        plaintext: &[u8],
        nonce: &[u8],
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>, CoseError> {
        self.validate(KeyOp::Encrypt)?;
        let Primitive::Aead { seal, .. } = self.spec().primitive else {
            return Err(self.not_aead());
        };
        self.check_nonce(nonce)?;
        seal(self.key(), nonce, plaintext, aad.unwrap_or_default())
            .map_err(|e| CoseError::encode("encrypt", e))
    }

    /// Authenticated decryption
    pub fn open(
        &self,
        ciphertext: &[u8],
        nonce: &[u8],
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>, CoseError> {
        self.validate(KeyOp::Decrypt)?;
        let Primitive::Aead { open, .. } = self.spec().primitive else {
            return Err(self.not_aead());
        };
        self.check_nonce(nonce)?;
        open(self.key(), nonce, ciphertext, aad.unwrap_or_default())
            .map_err(|e| CoseError::decode("decrypt", e))
    }

    fn aead_nonce_len(&self) -> Result<usize, CoseError> {
        match self.spec().primitive {
            Primitive::Aead { .. } => Ok(self.spec().nonce_len),
            _ => Err(self.not_aead()),
        }
    }

    fn check_nonce(&self, nonce: &[u8]) -> Result<(), CoseError> {
        let expected = self.aead_nonce_len()?;
        if nonce.len() != expected {
            return Err(CoseError::InvalidArgument(format!(
                "The length of nonce should be {expected} bytes."
            )));
        }
        Ok(())
    }

    fn not_aead(&self) -> CoseError {
        CoseError::InvalidArgument(format!("{} is not an AEAD algorithm", self.alg()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{Algorithm, AlgorithmClass};
    use crate::key::KeyParams;
    use proptest::prelude::*;

    fn aead_algorithms() -> Vec<Algorithm> {
        Algorithm::all()
            .filter(|a| a.spec().map(|s| s.class == AlgorithmClass::Aead).unwrap_or(false))
            .collect()
    }

    fn mac_algorithms() -> Vec<Algorithm> {
        Algorithm::all()
            .filter(|a| a.spec().map(|s| s.class == AlgorithmClass::Mac).unwrap_or(false))
            .collect()
    }

    #[test]
    fn test_mac_truncation() {
        let key = CoseKey::generate(Algorithm::HMAC_256_64).unwrap();
        assert_eq!(key.mac(b"Hello world!").unwrap().len(), 8);
        let key = CoseKey::generate(Algorithm::HMAC_512_512).unwrap();
        assert_eq!(key.mac(b"Hello world!").unwrap().len(), 64);
    }

    #[test]
    fn test_verify_mac_with_other_key_fails() {
        let key = CoseKey::generate(Algorithm::HMAC_256_256).unwrap();
        let other = CoseKey::generate(Algorithm::HMAC_256_256).unwrap();
        let tag = key.mac(b"Hello world!").unwrap();
        let err = other.verify_mac(b"Hello world!", &tag).unwrap_err();
        assert!(err.is_verify_error());
        assert_eq!(err.to_string(), "Failed to compare digest.");
    }

    #[test]
    fn test_mac_requires_capability() {
        let params = KeyParams {
            alg: Some(Algorithm::HMAC_256_256.id()),
            key_ops: vec![KeyOp::MacVerify.id()],
            ..KeyParams::default()
        };
        let key = CoseKey::new(params).unwrap();
        assert!(key.mac(b"msg").unwrap_err().is_argument_error());
    }

    #[test]
    fn test_nonce_length_policy_for_every_aead() {
        for alg in aead_algorithms() {
            let key = CoseKey::generate(alg).unwrap();
            let required = key.spec().nonce_len;
            let bad = vec![0u8; required + 1];
            let err = key.seal(b"pt", &bad, None).unwrap_err();
            assert!(err.is_argument_error(), "{alg}");
            assert_eq!(
                err.to_string(),
                format!("invalid argument: The length of nonce should be {required} bytes.")
            );
            assert!(key.open(b"ct-ct-ct-ct-ct-ct", &bad, None).unwrap_err().is_argument_error());
            assert_eq!(key.generate_nonce().unwrap().len(), required);
        }
    }

    #[test]
    fn test_open_with_wrong_key_is_decode_error() {
        let key = CoseKey::from_symmetric_key(&[1u8; 16], Algorithm::AES_CCM_16_64_128, None).unwrap();
        let other = CoseKey::from_symmetric_key(&[2u8; 16], Algorithm::AES_CCM_16_64_128, None).unwrap();
        let nonce = [9u8; 13];
        let ct = key.seal(b"claims", &nonce, None).unwrap();
        let err = other.open(&ct, &nonce, None).unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_mac_key_cannot_seal() {
        let key = CoseKey::generate(Algorithm::HMAC_256_256).unwrap();
        assert!(key.generate_nonce().is_err());
        assert!(key.seal(b"x", &[0u8; 12], None).is_err());
    }

    proptest! {
        #[test]
        fn prop_mac_roundtrip_and_tamper(
            idx in 0usize..4,
            msg in proptest::collection::vec(any::<u8>(), 0..256),
            flip in any::<usize>(),
        ) {
            let alg = mac_algorithms()[idx];
            let key = CoseKey::generate(alg).unwrap();
            let tag = key.mac(&msg).unwrap();
            prop_assert!(key.verify_mac(&msg, &tag).is_ok());

            let mut bad = tag.clone();
            let pos = flip % bad.len();
            bad[pos] ^= 0x01;
            prop_assert!(key.verify_mac(&msg, &bad).unwrap_err().is_verify_error());
        }

        #[test]
        fn prop_aead_roundtrip_and_tamper(
            idx in 0usize..12,
            plaintext in proptest::collection::vec(any::<u8>(), 0..256),
            aad in proptest::collection::vec(any::<u8>(), 1..64),
            flip in any::<usize>(),
        ) {
            let algs = aead_algorithms();
            let key = CoseKey::generate(algs[idx % algs.len()]).unwrap();
            let nonce = key.generate_nonce().unwrap();
            let ct = key.seal(&plaintext, &nonce, Some(&aad)).unwrap();
            prop_assert_eq!(key.open(&ct, &nonce, Some(&aad)).unwrap(), plaintext);

            let mut bad_ct = ct.clone();
            let pos = flip % bad_ct.len();
            bad_ct[pos] ^= 0x80;
            prop_assert!(key.open(&bad_ct, &nonce, Some(&aad)).unwrap_err().is_decode_error());

            let mut bad_aad = aad.clone();
            let pos = flip % bad_aad.len();
            bad_aad[pos] ^= 0x01;
            prop_assert!(key.open(&ct, &nonce, Some(&bad_aad)).unwrap_err().is_decode_error());
        }
    }
}
