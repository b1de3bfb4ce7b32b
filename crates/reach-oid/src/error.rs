use thiserror::Error;

use crate::oid::OidKind;

/// Errors produced when parsing or constructing identities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OidError {
    /// The input does not match the identity grammar.
    #[error("malformed identifier {input:?}: {reason}")]
    Malformed { input: String, reason: String },

    /// The input is well-formed but encodes a different kind of identity.
    #[error("identifier {input:?} is a {actual} oid, expected {expected}")]
    KindMismatch {
        input: String,
        expected: OidKind,
        actual: OidKind,
    },

    /// A component passed to a constructor cannot be encoded.
    #[error("invalid {component} {value:?}: {reason}")]
    InvalidComponent {
        component: &'static str,
        value: String,
        reason: String,
    },
}

impl OidError {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the input failed to parse at all.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Convenience alias for identity operations.
pub type Result<T> = std::result::Result<T, OidError>;
