//! Encoder / decoder options

use serde::{Deserialize, Serialize};

/// How sibling recipients are resolved on decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientPolicy {
    /// Use the first recipient that yields a key
    #[default]
    FirstMatch,
    /// Try every sibling and require exactly one to yield a key
    ExactlyOne,
}

/// Behaviour of [`crate::Cwt`] when encoding and decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CwtOptions {
    /// Lifetime in seconds. Sets `iat` and `exp` on encode unless present.
    pub expires_in: Option<u64>,
    /// Clock skew tolerance in seconds for `exp` / `nbf`
    pub leeway: u64,
    /// Reject expired and not-yet-valid tokens on decode
    pub verify_time: bool,
    pub recipient_policy: RecipientPolicy,
}

impl Default for CwtOptions {
    fn default() -> Self {
        CwtOptions {
            expires_in: None,
            leeway: 60,
            verify_time: true,
            recipient_policy: RecipientPolicy::FirstMatch,
        }
    }
}
