//! Validation error types.

use thiserror::Error;

/// Result type for extraction.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Errors raised while turning a config object into a typed record.
///
/// These are never retried automatically: the object stays out of sync until
/// an operator corrects it and saves it again.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("config object does not contain the required element: {0}")]
    MissingField(&'static str),

    #[error("malformed JSON in element {field}: {source}")]
    Decode {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ValidationError {
    /// Name of the payload key the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField(field) => field,
            Self::Decode { field, .. } => field,
            Self::InvalidField { field, .. } => field,
        }
    }
}
