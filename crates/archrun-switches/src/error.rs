//! Error types for switch serialization

use thiserror::Error;

/// Validation errors raised while turning switches into tokens
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwitchError {
    #[error("invalid switch name '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("switch '-{key}' does not accept {shape} values")]
    UnsupportedShape { key: String, shape: &'static str },

    #[error("switch '-{key}' requires a non-empty value")]
    EmptyValue { key: String },

    #[error("switch '-{key}' has an invalid value: {reason}")]
    InvalidValue { key: String, reason: &'static str },
}

impl SwitchError {
    /// Name of the switch the error refers to.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::InvalidKey { key, .. }
            | Self::UnsupportedShape { key, .. }
            | Self::EmptyValue { key }
            | Self::InvalidValue { key, .. } => key,
        }
    }
}
