use std::fmt;

use serde::{Deserialize, Serialize};
use tessera_store::StoreError;
use tessera_types::EphemeralRef;

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// An asset could not be uploaded within the retry budget.
    #[error("upload of {filename} ({reference}) failed after {attempts} attempt(s): {source}")]
    UploadFailure {
        reference: EphemeralRef,
        filename: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// The tree holds a reference no registry of this run knows about.
    #[error("unresolved reference {0}: no pending asset is registered under it")]
    UnresolvedReference(String),
}

/// Why an inline `data:` string could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InlineError {
    #[error("not a data: uri")]
    NotInline,

    #[error("missing ',' between header and data")]
    MissingSeparator,

    #[error("invalid base64 data: {0}")]
    Base64(String),

    #[error("invalid media type: {0}")]
    MediaType(String),
}

/// Result alias for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// A download that did not hydrate. The url stays in the tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadFailure {
    pub url: String,
    pub reason: String,
}

impl fmt::Display for DownloadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not hydrate {}: {}", self.url, self.reason)
    }
}
