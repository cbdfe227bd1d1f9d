//! Error taxonomy for cryptographic operations
//!
//! Every failure falls into one of four kinds:
//! - **Argument**: malformed or out-of-policy input, caught before any primitive runs
//! - **Encode**: a primitive failed while producing protected output
//! - **Decode**: a primitive failed while recovering plaintext or a key
//! - **Verify**: a MAC, signature or derived-key comparison did not match

use cwt_protocol::CodecError;
use thiserror::Error;

use crate::key::KeyOp;

/// Coarse classification shared by every error type in the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Argument,
    Encode,
    Decode,
    Verify,
}

/// Key descriptor construction and capability errors
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("alg(3) not found")]
    MissingAlgorithm,

    #[error("Unsupported or unknown alg({0})")]
    UnsupportedAlgorithm(i64),

    #[error("Unknown kty({0})")]
    UnknownKeyType(i64),

    #[error("kty({kty}) is not valid for alg({alg})")]
    KeyTypeMismatch { kty: i64, alg: i64 },

    #[error("Unknown key_ops(4) value: {0}")]
    UnknownOperation(i64),

    #[error("key_ops(4) {op} is not permissible for alg({alg})")]
    IllegalOperation { op: KeyOp, alg: i64 },

    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("key material not found")]
    MissingMaterial,

    #[error("key is not permitted to {0}")]
    OperationNotPermitted(KeyOp),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Errors raised by the algorithm suite
#[derive(Debug, Error)]
pub enum CoseError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("key error: {0}")]
    Key(#[from] KeyError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Failed to {operation}: {reason}")]
    Encode {
        operation: &'static str,
        reason: String,
    },

    #[error("Failed to {operation}: {reason}")]
    Decode {
        operation: &'static str,
        reason: String,
    },

    #[error("{0}")]
    Verify(String),
}

impl CoseError {
    pub(crate) fn encode(operation: &'static str, reason: impl ToString) -> Self {
        CoseError::Encode {
            operation,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decode(operation: &'static str, reason: impl ToString) -> Self {
        CoseError::Decode {
            operation,
            reason: reason.to_string(),
        }
    }

    /// Which member of the taxonomy this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::Key(_) => ErrorKind::Argument,
            Self::Codec(e) => codec_kind(e),
            Self::Encode { .. } => ErrorKind::Encode,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Verify(_) => ErrorKind::Verify,
        }
    }

    pub fn is_argument_error(&self) -> bool {
        self.kind() == ErrorKind::Argument
    }

    pub fn is_verify_error(&self) -> bool {
        self.kind() == ErrorKind::Verify
    }

    pub fn is_decode_error(&self) -> bool {
        self.kind() == ErrorKind::Decode
    }
}

/// Classify a codec error by the direction it happened in
pub fn codec_kind(error: &CodecError) -> ErrorKind {
    match error {
        CodecError::Serialize(_) => ErrorKind::Encode,
        CodecError::Deserialize(_) | CodecError::Malformed(_) => ErrorKind::Decode,
        CodecError::InvalidHeader { .. } => ErrorKind::Argument,
    }
}
