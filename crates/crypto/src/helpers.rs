//! Cryptographic helper functions
//!
//! Secure randomness and constant-time comparison shared by every algorithm.

use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;

/// Produce `len` cryptographically random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Compare two byte strings without an early exit on the first differing byte.
///
/// Lengths are not secret; a length mismatch is simply unequal.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
