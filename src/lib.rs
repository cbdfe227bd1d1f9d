//! CBOR Web Token (CWT) envelopes
//!
//! Builds, validates and opens COSE-protected tokens:
//! - MAC'd (`COSE_Mac0` / `COSE_Mac`), signed (`COSE_Sign1`) and encrypted
//!   (`COSE_Encrypt0` / `COSE_Encrypt`) envelopes
//! - A recipient tree delivering the content key directly, by AES key wrap or
//!   by HKDF derivation from shared material
//!
//! # Example
//!
//! ```
//! use cwt::prelude::*;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let key = CoseKey::generate(Algorithm::HMAC_256_256)?;
//! let claims = Claims::new()
//!     .with(claims::label::ISS, "coaps://as.example")
//!     .with(claims::label::SUB, "dajiaji");
//!
//! let cwt = Cwt::new();
//! let token = cwt.encode_and_mac(&claims, &key, Vec::new())?;
//! assert_eq!(cwt.decode(&token, &key)?, claims);
//! # Ok(())
//! # }
//! ```

pub mod claims;
mod cwt;
pub mod envelope;
mod error;
mod options;
pub mod prelude;
pub mod recipient;

pub use crate::cwt::Cwt;
pub use claims::Claims;
pub use envelope::{Envelope, EnvelopeKind};
pub use error::CwtError;
pub use options::{CwtOptions, RecipientPolicy};
pub use recipient::{Recipient, RecipientMode};

pub use cwt_crypto::{Algorithm, CoseKey, ErrorKind, KdfContext, KeyOp};
