use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessera_types::{Payload, PermanentAsset};

use crate::error::{StoreError, StoreResult};
use crate::key::{storage_key, validate_key};
use crate::traits::ContentStore;

const META_SUFFIX: &str = ".meta.json";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Sidecar written next to every stored file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetMeta {
    content_type: String,
    size: u64,
}

/// Directory-backed content store.
///
/// An asset with storage key `c7/a.png` lives at `<root>/c7/a.png`, with its
/// content type in `<root>/c7/a.png.meta.json`, and is published as
/// `<base_url>/c7/a.png`.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
    base_url: String,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn key_of<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|rest| rest.split(['?', '#']).next().unwrap_or(rest))
            .filter(|key| !key.is_empty())
    }

    fn path_of(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |path, seg| path.join(seg))
    }

    fn meta_path_of(&self, key: &str) -> PathBuf {
        self.path_of(&format!("{key}{META_SUFFIX}"))
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn upload(
        &self,
        payload: &Payload,
        name: &str,
        path_hint: Option<&str>,
    ) -> StoreResult<PermanentAsset> {
        let key = storage_key(name, path_hint)?;
        let path = self.path_of(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let meta = AssetMeta {
            content_type: payload.content_type().to_string(),
            size: payload.size(),
        };
        tokio::fs::write(&path, payload.data()).await?;
        tokio::fs::write(self.meta_path_of(&key), serde_json::to_vec(&meta)?).await?;
        tracing::debug!(%key, size = meta.size, "stored asset on disk");

        Ok(PermanentAsset::new(
            format!("{}/{key}", self.base_url),
            key,
            meta.content_type,
            meta.size,
        ))
    }

    async fn download(&self, url: &str) -> StoreResult<Payload> {
        let key = self
            .key_of(url)
            .ok_or_else(|| StoreError::ForeignUrl(url.to_string()))?;
        validate_key(key)?;

        let data = match tokio::fs::read(self.path_of(key)).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(url.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let content_type = match tokio::fs::read(self.meta_path_of(key)).await {
            Ok(raw) => serde_json::from_slice::<AssetMeta>(&raw)?.content_type,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(%key, "metadata sidecar missing; assuming octet-stream");
                FALLBACK_CONTENT_TYPE.to_string()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Payload::new(data, content_type))
    }

    fn owns_url(&self, url: &str) -> bool {
        self.key_of(url).is_some()
    }
}
