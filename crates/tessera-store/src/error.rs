/// Errors from content-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No asset exists at the requested url or key.
    #[error("asset not found: {0}")]
    NotFound(String),

    /// The url does not belong to this store.
    #[error("url is not served by this store: {0}")]
    ForeignUrl(String),

    /// The storage key is empty or escapes the store root.
    #[error("invalid storage key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Network failure talking to a remote store.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote store answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The remote store answered with something we cannot interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization or deserialization failure of store metadata.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure injected by the in-memory backend.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl StoreError {
    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Transport(_) | StoreError::Io(_) | StoreError::Injected(_) => true,
            StoreError::Status { status, .. } => *status == 429 || *status >= 500,
            StoreError::NotFound(_)
            | StoreError::ForeignUrl(_)
            | StoreError::InvalidKey { .. }
            | StoreError::InvalidResponse(_)
            | StoreError::Serialization(_) => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => StoreError::Status {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            None => StoreError::Transport(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
