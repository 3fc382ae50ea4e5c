use thiserror::Error;

/// Errors from registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The payload is not a recognised binary type. Always local, never
    /// retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// The reference is not tracked by this registry. Only ever reported as
    /// a diagnostic warning by `remove`.
    #[error("unknown reference: {0}")]
    UnknownReference(String),

    /// Two registries backed by different handle tables cannot be merged.
    #[error("cannot merge registries backed by different handle tables")]
    ForeignHandles,
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
