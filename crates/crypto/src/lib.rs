//! CWT Cryptographic Operations
//!
//! This crate turns abstract key descriptors into concrete, capability-checked
//! cryptographic operations for COSE / CWT envelopes:
//! - [`CoseKey`]: a key descriptor carrying algorithm, permitted operations and
//!   zeroizing key material
//! - A fixed algorithm registry ([`Algorithm`], [`AlgorithmSpec`]) that owns the
//!   key / nonce / tag length policy of every supported algorithm
//! - HMAC and AEAD (AES-GCM, AES-CCM, ChaCha20-Poly1305) operations
//! - AES key wrap (RFC 3394) and HKDF key derivation with the COSE KDF context
//! - ES256 / ES384 / ES512 signatures backed by `p256`, `p384` and `p521`, and
//!   EdDSA over Ed25519 backed by `ed25519-dalek`
//!
//! # Security Features
//!
//! - **Zeroization**: key material uses `zeroize` to clear memory on drop
//! - **Constant-time comparison**: MAC and derived-key checks use `subtle::ConstantTimeEq`
//! - **Length policy before primitives**: wrong-length keys and nonces are rejected
//!   before any primitive is invoked
//!
//! # Example
//!
//! ```
//! use cwt_crypto::{Algorithm, CoseKey};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let key = CoseKey::generate(Algorithm::A128GCM)?;
//! let nonce = key.generate_nonce()?;
//! let ciphertext = key.seal(b"claims", &nonce, None)?;
//! assert_eq!(key.open(&ciphertext, &nonce, None)?, b"claims");
//! # Ok(())
//! # }
//! ```

pub mod aead;
pub mod algorithm;
pub mod error;
pub mod helpers;
pub mod hmac;
pub mod kdf;
pub mod key;
pub mod key_wrap;
pub mod signature;
pub mod symmetric;
pub mod types;

// Re-export commonly used types
pub use algorithm::{Algorithm, AlgorithmClass, AlgorithmSpec};
pub use error::{CoseError, ErrorKind, KeyError};
pub use helpers::{ct_eq, random_bytes};
pub use kdf::{build_context, KdfContext, PartyInfo, PartyNonce, SuppPubInfo};
pub use key::{CoseKey, Curve, KeyOp, KeyParams, KeyType};
pub use types::SecretBytes;
