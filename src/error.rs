//! Unified error type for the CWT public API
//!
//! The member crates keep their own error types ([`CoseError`], [`CodecError`]).
//! This type wraps them and adds token-level failures, so callers handle a
//! single `Result<_, CwtError>`.
//!
//! # Example
//!
//! ```no_run
//! use cwt::{CwtError, ErrorKind};
//!
//! fn check(result: Result<(), CwtError>) {
//!     if let Err(e) = result {
//!         match e.kind() {
//!             ErrorKind::Verify => eprintln!("untrusted token: {e}"),
//!             _ => eprintln!("rejected: {e}"),
//!         }
//!     }
//! }
//! ```

use cwt_crypto::error::codec_kind;
use cwt_crypto::{CoseError, ErrorKind};
use cwt_protocol::CodecError;
use thiserror::Error;

/// Unified error type for all CWT operations
///
/// # Error Categories
///
/// - **Argument**: bad claims, keys, nonces or recipient shapes supplied by the caller
/// - **Encode**: a primitive failed while producing a token
/// - **Decode**: a token is malformed, cannot be decrypted, or no recipient resolves
/// - **Verify**: a MAC, signature or time check failed
#[derive(Debug, Error)]
pub enum CwtError {
    /// Error raised by the algorithm suite
    #[error(transparent)]
    Cose(#[from] CoseError),

    /// CBOR or header structure error
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A claim has the wrong type
    #[error("{0}")]
    InvalidClaims(String),

    /// Invalid recipient structure or other caller input
    #[error("{0}")]
    InvalidArgument(String),

    /// Well-formed CBOR that is not a CWT
    #[error("Failed to decode: {0}")]
    Malformed(String),

    /// No recipient produced a usable key
    #[error("Failed to decode key: {0}")]
    Unresolved(String),

    #[error("The token has expired (exp: {exp}, now: {now})")]
    Expired { exp: i64, now: i64 },

    #[error("The token is not yet valid (nbf: {nbf}, now: {now})")]
    NotYetValid { nbf: i64, now: i64 },
}

impl CwtError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Cose(e) => e.kind(),
            Self::Codec(e) => codec_kind(e),
            Self::InvalidClaims(_) | Self::InvalidArgument(_) => ErrorKind::Argument,
            Self::Malformed(_) | Self::Unresolved(_) => ErrorKind::Decode,
            Self::Expired { .. } | Self::NotYetValid { .. } => ErrorKind::Verify,
        }
    }

    /// Returns true if the caller supplied invalid input
    pub fn is_argument_error(&self) -> bool {
        self.kind() == ErrorKind::Argument
    }

    /// Returns true if producing the token failed inside a primitive
    pub fn is_encode_error(&self) -> bool {
        self.kind() == ErrorKind::Encode
    }

    /// Returns true if the token could not be decoded or decrypted
    pub fn is_decode_error(&self) -> bool {
        self.kind() == ErrorKind::Decode
    }

    /// Returns true if an integrity or validity check failed
    pub fn is_verify_error(&self) -> bool {
        self.kind() == ErrorKind::Verify
    }

    /// Returns true if the token was rejected because of its time claims
    pub fn is_time_error(&self) -> bool {
        matches!(self, Self::Expired { .. } | Self::NotYetValid { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = CwtError::InvalidClaims("iss(1) should be str.".to_string());
        assert!(err.is_argument_error());
        assert!(!err.is_verify_error());

        let err = CwtError::Expired { exp: 10, now: 100 };
        assert!(err.is_verify_error());
        assert!(err.is_time_error());

        let err = CwtError::from(CoseError::Verify("Failed to compare digest.".to_string()));
        assert!(err.is_verify_error());
        assert!(!err.is_time_error());

        let err = CwtError::from(CodecError::Deserialize("eof".to_string()));
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_error_display() {
        let err = CwtError::Expired { exp: 10, now: 100 };
        assert!(err.to_string().contains("expired"));
        let err = CwtError::Unresolved("no recipient matched".to_string());
        assert_eq!(err.to_string(), "Failed to decode key: no recipient matched");
    }
}
