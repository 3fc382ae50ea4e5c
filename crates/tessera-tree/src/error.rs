use thiserror::Error;

/// Errors from tree conversion.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The tree contains a container that (indirectly) contains itself and
    /// cannot be expressed in an acyclic format.
    #[error("tree contains a cycle at {path}")]
    Cycle { path: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
