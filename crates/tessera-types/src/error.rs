use thiserror::Error;

/// Errors produced by type construction and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid content type {value:?}: {reason}")]
    InvalidContentType { value: String, reason: String },

    #[error("not an ephemeral reference: {0:?}")]
    InvalidReference(String),
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
