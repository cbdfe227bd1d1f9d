//! CWT Prelude
//!
//! Commonly used types in one import.
//!
//! ```rust
//! use cwt::prelude::*;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let key = CoseKey::generate(Algorithm::A128GCM)?;
//! let token = Cwt::new().encode_and_encrypt(&Claims::new(), &key, None, Vec::new())?;
//! assert!(Cwt::new().decode(&token, &key)?.is_empty());
//! # Ok(())
//! # }
//! ```

pub use crate::claims::{self, Claims};
pub use crate::cwt::Cwt;
pub use crate::envelope::{Envelope, EnvelopeKind};
pub use crate::error::CwtError;
pub use crate::options::{CwtOptions, RecipientPolicy};
pub use crate::recipient::{Recipient, RecipientMode};

// Re-export crypto types
pub use cwt_crypto::{
    Algorithm, AlgorithmClass, CoseError, CoseKey, Curve, ErrorKind, KdfContext, KeyOp, KeyParams,
    KeyType, PartyInfo, PartyNonce, SuppPubInfo,
};

// Re-export protocol types
pub use cwt_protocol::{label, Header};
