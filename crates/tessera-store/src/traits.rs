use async_trait::async_trait;
use tessera_types::{Payload, PermanentAsset};

use crate::error::StoreResult;

/// Durable content store.
///
/// All implementations must satisfy these invariants:
/// - An upload produces a new, immutable asset; its descriptor never changes.
/// - `download(upload(p).url)` yields the bytes and content type of `p`.
/// - `owns_url` is a pure function of the url: no I/O.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upload a payload under `name`, optionally below a path hint (for
    /// instance a campaign id), and return its durable descriptor.
    async fn upload(
        &self,
        payload: &Payload,
        name: &str,
        path_hint: Option<&str>,
    ) -> StoreResult<PermanentAsset>;

    /// Download the asset behind a durable url.
    async fn download(&self, url: &str) -> StoreResult<Payload>;

    /// Whether `url` is a durable url served by this store.
    fn owns_url(&self, url: &str) -> bool;
}
