use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tessera_types::{Payload, PermanentAsset};

use crate::error::{StoreError, StoreResult};
use crate::key::storage_key;
use crate::traits::ContentStore;

/// Base url of the in-memory store unless overridden.
pub const DEFAULT_BASE_URL: &str = "https://store.local";

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. Every upload and download is counted,
/// and failures can be injected per payload content, per url, or for the
/// next N uploads.
pub struct InMemoryContentStore {
    base_url: String,
    objects: RwLock<HashMap<String, Payload>>,
    upload_calls: AtomicUsize,
    download_calls: AtomicUsize,
    failing_contents: RwLock<HashSet<Bytes>>,
    failing_urls: RwLock<HashSet<String>>,
    transient_upload_failures: AtomicUsize,
}

impl InMemoryContentStore {
    /// Create a new empty store serving urls under [`DEFAULT_BASE_URL`].
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a new empty store serving urls under `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
            upload_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            failing_contents: RwLock::new(HashSet::new()),
            failing_urls: RwLock::new(HashSet::new()),
            transient_upload_failures: AtomicUsize::new(0),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Public url of a storage key.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }

    /// Place an asset directly in the store, bypassing the upload counter.
    pub fn insert(&self, key: &str, payload: Payload) -> PermanentAsset {
        let asset = PermanentAsset::new(
            self.url_for(key),
            key,
            payload.content_type(),
            payload.size(),
        );
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), payload);
        asset
    }

    /// Stored payload for a key.
    pub fn get(&self, key: &str) -> Option<Payload> {
        self.objects.read().expect("lock poisoned").get(key).cloned()
    }

    /// Every upload of a payload with exactly these bytes fails.
    pub fn fail_uploads_of(&self, content: impl Into<Bytes>) {
        self.failing_contents
            .write()
            .expect("lock poisoned")
            .insert(content.into());
    }

    /// Every download of this url fails.
    pub fn fail_downloads_of(&self, url: impl Into<String>) {
        self.failing_urls
            .write()
            .expect("lock poisoned")
            .insert(url.into());
    }

    /// The next `count` upload attempts fail, whatever their content.
    pub fn fail_next_uploads(&self, count: usize) {
        self.transient_upload_failures.store(count, Ordering::SeqCst);
    }

    /// Number of upload calls received, including failed ones.
    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Number of download calls received, including failed ones.
    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    /// Number of assets currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Sorted list of all storage keys.
    pub fn keys(&self) -> Vec<String> {
        let map = self.objects.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn take_transient_failure(&self) -> bool {
        self.transient_upload_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn key_of<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn upload(
        &self,
        payload: &Payload,
        name: &str,
        path_hint: Option<&str>,
    ) -> StoreResult<PermanentAsset> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);

        if self.take_transient_failure() {
            return Err(StoreError::Injected(format!("transient failure uploading {name}")));
        }
        let poisoned = self
            .failing_contents
            .read()
            .expect("lock poisoned")
            .contains(payload.data());
        if poisoned {
            return Err(StoreError::Injected(format!("upload of {name} rejected")));
        }

        let key = storage_key(name, path_hint)?;
        Ok(self.insert(&key, payload.clone()))
    }

    async fn download(&self, url: &str) -> StoreResult<Payload> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_urls.read().expect("lock poisoned").contains(url) {
            return Err(StoreError::Injected(format!("download of {url} rejected")));
        }
        let key = self
            .key_of(url)
            .ok_or_else(|| StoreError::ForeignUrl(url.to_string()))?;
        self.get(key)
            .ok_or_else(|| StoreError::NotFound(url.to_string()))
    }

    fn owns_url(&self, url: &str) -> bool {
        self.key_of(url).is_some()
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("base_url", &self.base_url)
            .field("object_count", &self.len())
            .finish()
    }
}
