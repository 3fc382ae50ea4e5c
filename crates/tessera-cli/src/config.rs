use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tessera_pipeline::PersistConfig;
use tessera_store::{ContentStore, FsContentStore, HttpContentStore, HttpStoreConfig};

const DEFAULT_CONFIG_FILE: &str = "tessera.toml";

/// `tessera.toml`. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub store: StoreSection,
    pub persist: PersistSection,
    pub log: LogSection,
}

/// Which content store the commands talk to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Fs,
    Http,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub backend: StoreBackend,
    /// Directory holding the stored assets (`fs` backend).
    pub root: PathBuf,
    /// Public url prefix of stored assets (`fs` backend).
    pub base_url: String,
    pub http: HttpSection,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Fs,
            root: PathBuf::from(".tessera/store"),
            base_url: "http://localhost:8080/assets".into(),
            http: HttpSection::default(),
        }
    }
}

/// `[store.http]`: settings of the `http` backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub upload_endpoint: String,
    pub download_proxy: String,
    pub public_base: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        let defaults = HttpStoreConfig::default();
        Self {
            upload_endpoint: defaults.upload_endpoint,
            download_proxy: defaults.download_proxy,
            public_base: defaults.public_base,
            access_token: defaults.access_token,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

impl HttpSection {
    pub fn store_config(&self) -> HttpStoreConfig {
        HttpStoreConfig {
            upload_endpoint: self.upload_endpoint.clone(),
            download_proxy: self.download_proxy.clone(),
            public_base: self.public_base.clone(),
            access_token: self.access_token.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistSection {
    pub upload_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for PersistSection {
    fn default() -> Self {
        let defaults = PersistConfig::default();
        Self {
            upload_retries: defaults.upload_retries,
            retry_backoff_ms: defaults.retry_backoff.as_millis() as u64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

impl CliConfig {
    /// Load `path`, or `./tessera.toml` when it exists, or the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => PathBuf::from(DEFAULT_CONFIG_FILE),
            None => return Ok(Self::default()),
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn persist_config(&self, campaign: Option<String>) -> PersistConfig {
        PersistConfig {
            upload_retries: self.persist.upload_retries,
            retry_backoff: Duration::from_millis(self.persist.retry_backoff_ms),
            path_hint: campaign,
        }
    }

    /// The configured content store.
    pub fn content_store(&self) -> anyhow::Result<Arc<dyn ContentStore>> {
        let store: Arc<dyn ContentStore> = match self.store.backend {
            StoreBackend::Fs => Arc::new(FsContentStore::new(&self.store.root, &self.store.base_url)),
            StoreBackend::Http => Arc::new(
                HttpContentStore::new(self.store.http.store_config())
                    .context("building http content store")?,
            ),
        };
        Ok(store)
    }

    /// Where the configured store keeps assets, for diagnostics.
    pub fn store_location(&self) -> String {
        match self.store.backend {
            StoreBackend::Fs => self.store.root.display().to_string(),
            StoreBackend::Http => self.store.http.upload_endpoint.clone(),
        }
    }
}
