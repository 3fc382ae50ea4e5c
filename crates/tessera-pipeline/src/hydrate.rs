//! The hydrate pipeline: durable urls in, live ephemeral references out.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tessera_registry::{HandleTable, PendingAssetRegistry};
use tessera_store::ContentStore;
use tessera_tree::{collect_strings, traverse, Node};
use tessera_types::{EphemeralRef, Payload};
use tracing::{debug, info, warn};

use crate::config::HydrateConfig;
use crate::error::DownloadFailure;
use crate::naming::display_name;
use crate::progress::{ProgressSink, Tally};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Output of a hydrate run.
#[derive(Debug)]
pub struct Hydrated {
    /// Rewritten copy of the loaded tree.
    pub tree: Node,
    /// One entry per hydrated asset. The caller merges it into its live
    /// registry; dropping it revokes the new references.
    pub assets: PendingAssetRegistry,
    /// Downloads that failed. Their urls are still in `tree`.
    pub failures: Vec<DownloadFailure>,
}

impl Hydrated {
    /// Whether every durable url was hydrated.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Downloads the durable assets of a loaded tree into a fresh registry.
pub struct Hydrator {
    store: Arc<dyn ContentStore>,
    handles: Arc<HandleTable>,
    config: HydrateConfig,
}

impl Hydrator {
    /// `handles` is the session's handle table; the returned registries mint
    /// through it so they can be merged into the live registry.
    pub fn new(store: Arc<dyn ContentStore>, handles: Arc<HandleTable>, config: HydrateConfig) -> Self {
        Self {
            store,
            handles,
            config,
        }
    }

    /// Download each distinct url the store owns, register it under a new
    /// reference, and rewrite every occurrence.
    ///
    /// Never fails as a whole: a download error is logged, reported in
    /// [`Hydrated::failures`], and leaves that url in place.
    pub async fn hydrate(&self, loaded: &Node, progress: &dyn ProgressSink) -> Hydrated {
        let working = loaded.deep_copy();
        let urls = collect_strings(&working, |s| self.store.owns_url(s));
        info!(assets = urls.len(), "hydrating state tree");

        let tally = Tally::new(urls.len(), progress);
        let downloads = urls.into_iter().map(|url| {
            let tally = &tally;
            async move {
                let result = self.store.download(&url).await;
                tally.complete_one();
                (url, result)
            }
        });
        let results = join_all(downloads).await;

        let mut assets = PendingAssetRegistry::new(Arc::clone(&self.handles));
        let mut replacements: HashMap<String, EphemeralRef> = HashMap::new();
        let mut failures = Vec::new();

        for (url, result) in results {
            let registered = result
                .map_err(|e| e.to_string())
                .and_then(|payload| {
                    assets
                        .add(self.prepare(&url, payload))
                        .map_err(|e| e.to_string())
                });
            match registered {
                Ok(reference) => {
                    debug!(%url, %reference, "hydrated asset");
                    replacements.insert(url, reference);
                }
                Err(reason) => {
                    warn!(%url, %reason, "could not hydrate asset, keeping durable url");
                    failures.push(DownloadFailure { url, reason });
                }
            }
        }

        traverse(&working, |key, value, owner| {
            if let Some(reference) = value.as_str().and_then(|s| replacements.get(s)) {
                owner.set(key, Node::string(reference.as_str()));
            }
        });

        info!(hydrated = replacements.len(), failed = failures.len(), "hydrate complete");
        Hydrated {
            tree: working,
            assets,
            failures,
        }
    }

    fn prepare(&self, url: &str, payload: Payload) -> Payload {
        let name = display_name(url, &self.config.fallback_name_prefix);
        let payload = if payload.mime().is_ok() {
            payload
        } else {
            warn!(%url, content_type = payload.content_type(), "unusable content type, storing as octet-stream");
            Payload::new(payload.into_data(), FALLBACK_CONTENT_TYPE)
        };
        payload.with_name(name)
    }
}
