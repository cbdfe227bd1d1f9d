//! Signature capability
//!
//! ECDSA over P-256, P-384 and P-521 (ES256 / ES384 / ES512) and EdDSA over
//! Ed25519. ECDSA signatures are the fixed-width `r || s` form; public keys are
//! uncompressed SEC1 points for EC2 curves and the raw 32-byte point for Ed25519.

use p256::ecdsa::signature::{Signer, Verifier};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;

use crate::algorithm::Primitive;
use crate::error::{CoseError, KeyError};
use crate::key::{CoseKey, KeyOp};

macro_rules! ecdsa_capability {
    ($curve:ident, $sign:ident, $verify:ident, $public_key:ident, $generate:ident) => {
        pub fn $sign(private: &[u8], msg: &[u8]) -> Result<Vec<u8>, String> {
            let signing_key =
                $curve::ecdsa::SigningKey::from_slice(private).map_err(|e| e.to_string())?;
            let signature: $curve::ecdsa::Signature =
                signing_key.try_sign(msg).map_err(|e| e.to_string())?;
            Ok(signature.to_bytes().to_vec())
        }

        pub fn $verify(public: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), String> {
            let verifying_key =
                $curve::ecdsa::VerifyingKey::from_sec1_bytes(public).map_err(|e| e.to_string())?;
            let signature =
                $curve::ecdsa::Signature::from_slice(sig).map_err(|e| e.to_string())?;
            verifying_key
                .verify(msg, &signature)
                .map_err(|e| e.to_string())
        }

        /// Uncompressed SEC1 point for a private scalar
        pub fn $public_key(private: &[u8]) -> Result<Vec<u8>, String> {
            let secret = $curve::SecretKey::from_slice(private).map_err(|e| e.to_string())?;
            Ok(secret.public_key().to_encoded_point(false).as_bytes().to_vec())
        }

        pub fn $generate() -> Vec<u8> {
            $curve::SecretKey::random(&mut OsRng).to_bytes().to_vec()
        }
    };
}

ecdsa_capability!(p256, es256_sign, es256_verify, es256_public_key, es256_generate);
ecdsa_capability!(p384, es384_sign, es384_verify, es384_public_key, es384_generate);
ecdsa_capability!(p521, es512_sign, es512_verify, es512_public_key, es512_generate);

fn ed25519_signing_key(private: &[u8]) -> Result<ed25519_dalek::SigningKey, String> {
    let bytes: &[u8; 32] = private
        .try_into()
        .map_err(|_| format!("Ed25519 private key should be 32 bytes, got {}", private.len()))?;
    Ok(ed25519_dalek::SigningKey::from_bytes(bytes))
}

pub fn ed25519_sign(private: &[u8], msg: &[u8]) -> Result<Vec<u8>, String> {
    let signature = ed25519_signing_key(private)?
        .try_sign(msg)
        .map_err(|e| e.to_string())?;
    Ok(signature.to_bytes().to_vec())
}

pub fn ed25519_verify(public: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), String> {
    let bytes: &[u8; 32] = public
        .try_into()
        .map_err(|_| format!("Ed25519 public key should be 32 bytes, got {}", public.len()))?;
    let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(bytes).map_err(|e| e.to_string())?;
    let signature = ed25519_dalek::Signature::from_slice(sig).map_err(|e| e.to_string())?;
    verifying_key
        .verify_strict(msg, &signature)
        .map_err(|e| e.to_string())
}

pub fn ed25519_public_key(private: &[u8]) -> Result<Vec<u8>, String> {
    Ok(ed25519_signing_key(private)?.verifying_key().to_bytes().to_vec())
}

pub fn ed25519_generate() -> Vec<u8> {
    ed25519_dalek::SigningKey::generate(&mut OsRng).to_bytes().to_vec()
}

impl CoseKey {
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, CoseError> {
        self.validate(KeyOp::Sign)?;
        let Primitive::Signature { sign, .. } = self.spec().primitive else {
            return Err(CoseError::InvalidArgument(format!(
                "{} is not a signature algorithm",
                self.alg()
            )));
        };
        if self.key().is_empty() {
            return Err(KeyError::MissingMaterial.into());
        }
        sign(self.key(), msg).map_err(|e| CoseError::encode("sign", e))
    }

    pub fn verify(&self, msg: &[u8], sig: &[u8]) -> Result<(), CoseError> {
        self.validate(KeyOp::Verify)?;
        let Primitive::Signature { verify, .. } = self.spec().primitive else {
            return Err(CoseError::InvalidArgument(format!(
                "{} is not a signature algorithm",
                self.alg()
            )));
        };
        let public = self.public_bytes().ok_or(KeyError::MissingMaterial)?;
        verify(public, msg, sig)
            .map_err(|e| CoseError::Verify(format!("Failed to verify signature: {e}")))
    }
}
