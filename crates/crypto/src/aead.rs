//! AEAD primitive bindings
//!
//! One generic seal/open pair instantiated per cipher type. The registry in
//! [`crate::algorithm`] stores the instantiations as function pointers; policy
//! (nonce length, key length, capability checks) lives in [`crate::symmetric`].

// Nonce::from_slice() is the correct API for aead 0.5 / generic_array 0.14
#![allow(deprecated)]

use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::consts::{U12, U13, U16, U7, U8};
use aes_gcm::aead::generic_array::typenum::Unsigned;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, Nonce, Payload};
use aes_gcm::AesGcm;
use ccm::Ccm;

pub use aes_gcm::{Aes128Gcm, Aes256Gcm};
pub use chacha20poly1305::ChaCha20Poly1305;

// aes-gcm only ships 128/256-bit aliases
pub type Aes192Gcm = AesGcm<Aes192, U12>;

// Ccm<cipher, tag size, nonce size>
#[allow(non_camel_case_types)]
pub type Ccm16_64_128 = Ccm<Aes128, U8, U13>;
#[allow(non_camel_case_types)]
pub type Ccm16_64_256 = Ccm<Aes256, U8, U13>;
#[allow(non_camel_case_types)]
pub type Ccm64_64_128 = Ccm<Aes128, U8, U7>;
#[allow(non_camel_case_types)]
pub type Ccm64_64_256 = Ccm<Aes256, U8, U7>;
#[allow(non_camel_case_types)]
pub type Ccm16_128_128 = Ccm<Aes128, U16, U13>;
#[allow(non_camel_case_types)]
pub type Ccm16_128_256 = Ccm<Aes256, U16, U13>;
#[allow(non_camel_case_types)]
pub type Ccm64_128_128 = Ccm<Aes128, U16, U7>;
#[allow(non_camel_case_types)]
pub type Ccm64_128_256 = Ccm<Aes256, U16, U7>;

/// Encrypt `msg` and append the tag
pub fn seal_with<C>(key: &[u8], nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>, String>
where
    C: KeyInit + Aead,
{
    let cipher = C::new_from_slice(key).map_err(|e| e.to_string())?;
    check_nonce::<C>(nonce)?;
    cipher
        .encrypt(Nonce::<C>::from_slice(nonce), Payload { msg, aad })
        .map_err(|e| e.to_string())
}

/// Verify the trailing tag and decrypt
pub fn open_with<C>(key: &[u8], nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>, String>
where
    C: KeyInit + Aead,
{
    let cipher = C::new_from_slice(key).map_err(|e| e.to_string())?;
    check_nonce::<C>(nonce)?;
    cipher
        .decrypt(Nonce::<C>::from_slice(nonce), Payload { msg, aad })
        .map_err(|e| e.to_string())
}

// from_slice panics on a length mismatch
fn check_nonce<C: AeadCore>(nonce: &[u8]) -> Result<(), String> {
    let expected = <C::NonceSize as Unsigned>::USIZE;
    if nonce.len() != expected {
        return Err(format!(
            "nonce length {} does not match cipher nonce size {expected}",
            nonce.len()
        ));
    }
    Ok(())
}
