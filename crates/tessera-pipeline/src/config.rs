use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the persist pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistConfig {
    /// Extra attempts per asset after the first failed upload.
    pub upload_retries: u32,
    /// Backoff before retry `n` is `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// Directory prefix for uploaded storage keys, usually the campaign id.
    pub path_hint: Option<String>,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            upload_retries: 2,
            retry_backoff: Duration::from_millis(250),
            path_hint: None,
        }
    }
}

impl PersistConfig {
    /// Fail on the first upload error.
    pub fn no_retry() -> Self {
        Self {
            upload_retries: 0,
            ..Default::default()
        }
    }

    pub fn with_path_hint(mut self, hint: impl Into<String>) -> Self {
        self.path_hint = Some(hint.into());
        self
    }

    /// Total upload attempts allowed per asset.
    pub fn max_attempts(&self) -> u32 {
        self.upload_retries.saturating_add(1)
    }
}

/// Configuration for the hydrate pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrateConfig {
    /// Display-name prefix for urls without a usable trailing segment.
    pub fallback_name_prefix: String,
}

impl Default for HydrateConfig {
    fn default() -> Self {
        Self {
            fallback_name_prefix: "downloaded_asset".into(),
        }
    }
}
