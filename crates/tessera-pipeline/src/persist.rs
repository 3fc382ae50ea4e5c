//! The persist pipeline: ephemeral references in, durable urls out.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::try_join_all;
use tessera_registry::PendingAssetRegistry;
use tessera_store::ContentStore;
use tessera_tree::{collect_strings, traverse, Node};
use tessera_types::{EphemeralRef, Payload, PermanentAsset};
use tracing::{debug, error, info, warn};

use crate::config::PersistConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::inline::{decode_inline, is_inline};
use crate::naming::asset_filename;
use crate::progress::{ProgressSink, Tally};
use crate::rules::apply_upload;

/// Result of a successful persist run.
#[derive(Debug)]
pub struct Persisted {
    /// Rewritten copy of the input tree. Holds no ephemeral references.
    pub tree: Node,
    pub report: PersistReport,
}

/// What a persist run transferred.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PersistReport {
    /// Distinct inline payloads decoded and uploaded.
    pub inlined: usize,
    /// Upload result for every distinct reference the tree held, including
    /// the run-local references of inline payloads.
    pub assets: BTreeMap<EphemeralRef, PermanentAsset>,
}

impl PersistReport {
    /// Number of uploads performed.
    pub fn uploaded(&self) -> usize {
        self.assets.len()
    }
}

/// Moves every pending asset of a tree to the content store.
///
/// A run works on a deep copy of the input. The caller's tree and registry
/// are never modified, whether the run succeeds or not.
pub struct Persister {
    store: Arc<dyn ContentStore>,
    config: PersistConfig,
}

impl Persister {
    pub fn new(store: Arc<dyn ContentStore>, config: PersistConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &PersistConfig {
        &self.config
    }

    /// Upload every distinct asset reachable from `tree` and return a copy
    /// in which each reference is replaced by its durable url.
    ///
    /// Inline `data:` strings are decoded and uploaded too. The run is
    /// all-or-nothing: the first upload that fails past the retry budget
    /// aborts it and no tree is produced.
    pub async fn persist(
        &self,
        tree: &Node,
        registry: &PendingAssetRegistry,
        progress: &dyn ProgressSink,
    ) -> PipelineResult<Persisted> {
        let working = tree.deep_copy();
        // Run-local references for inline payloads; dropping it revokes them
        // on every exit path.
        let mut local = PendingAssetRegistry::new(Arc::clone(registry.handles()));

        let inlined = normalize_inline(&working, &mut local);
        let pending = collect_pending(&working, registry, &local)?;
        info!(inlined, assets = pending.len(), "persisting state tree");

        let uploaded = self.upload_all(&pending, progress).await?;
        rewrite_references(&working, &uploaded);

        let revoked = local.close();
        info!(uploaded = uploaded.len(), revoked, "persist complete");

        Ok(Persisted {
            tree: working,
            report: PersistReport {
                inlined,
                assets: uploaded.into_iter().collect(),
            },
        })
    }

    async fn upload_all(
        &self,
        pending: &[(EphemeralRef, Payload)],
        progress: &dyn ProgressSink,
    ) -> PipelineResult<HashMap<EphemeralRef, PermanentAsset>> {
        let tally = Tally::new(pending.len(), progress);
        let uploads = pending.iter().map(|(reference, payload)| {
            let tally = &tally;
            async move {
                let asset = self.upload_one(reference, payload).await?;
                tally.complete_one();
                Ok::<_, PipelineError>((reference.clone(), asset))
            }
        });
        let uploaded = try_join_all(uploads).await?;
        Ok(uploaded.into_iter().collect())
    }

    async fn upload_one(
        &self,
        reference: &EphemeralRef,
        payload: &Payload,
    ) -> PipelineResult<PermanentAsset> {
        let filename = asset_filename(payload);
        let hint = self.config.path_hint.as_deref();
        let max_attempts = self.config.max_attempts();
        let mut attempt = 1;

        loop {
            let result = self.store.upload(payload, &filename, hint).await;
            match result {
                Ok(asset) => {
                    debug!(%reference, url = %asset.url, attempt, "uploaded asset");
                    return Ok(asset);
                }
                Err(e) if attempt < max_attempts && e.is_retryable() => {
                    warn!(%reference, %filename, attempt, error = %e, "upload failed, retrying");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(source) => {
                    error!(%reference, %filename, attempt, error = %source, "upload failed");
                    return Err(PipelineError::UploadFailure {
                        reference: reference.clone(),
                        filename,
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }
}

/// Replace every decodable inline payload with a run-local reference.
/// Identical inline strings share one reference. Returns the number of
/// distinct payloads registered.
fn normalize_inline(tree: &Node, local: &mut PendingAssetRegistry) -> usize {
    let mut decoded: HashMap<String, EphemeralRef> = HashMap::new();

    traverse(tree, |key, value, owner| {
        let Some(uri) = value.as_str().filter(|s| is_inline(s)) else {
            return;
        };
        let reference = match decoded.get(uri) {
            Some(reference) => reference.clone(),
            None => {
                let registered = decode_inline(uri)
                    .map_err(|e| e.to_string())
                    .and_then(|payload| local.add(payload).map_err(|e| e.to_string()));
                match registered {
                    Ok(reference) => {
                        decoded.insert(uri.to_string(), reference.clone());
                        reference
                    }
                    Err(reason) => {
                        warn!(at = %key, %reason, "leaving malformed inline payload unchanged");
                        return;
                    }
                }
            }
        };
        owner.set(key, Node::string(reference.as_str()));
    });

    decoded.len()
}

/// Distinct references reachable from `tree`, paired with their payloads.
fn collect_pending(
    tree: &Node,
    registry: &PendingAssetRegistry,
    local: &PendingAssetRegistry,
) -> PipelineResult<Vec<(EphemeralRef, Payload)>> {
    collect_strings(tree, EphemeralRef::is_reference)
        .into_iter()
        .map(|candidate| {
            match registry.entry(&candidate).or_else(|| local.entry(&candidate)) {
                Some((reference, payload)) => Ok((reference.clone(), payload.clone())),
                None => Err(PipelineError::UnresolvedReference(candidate)),
            }
        })
        .collect()
}

fn rewrite_references(tree: &Node, uploaded: &HashMap<EphemeralRef, PermanentAsset>) {
    traverse(tree, |key, value, owner| {
        if let Some(asset) = value.as_str().and_then(|s| uploaded.get(s)) {
            apply_upload(key, owner, asset);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;
    use tessera_registry::HandleTable;
    use tessera_store::InMemoryContentStore;
    use tessera_types::Progress;

    use crate::progress::NoProgress;

    struct Fixture {
        store: Arc<InMemoryContentStore>,
        handles: Arc<HandleTable>,
        registry: PendingAssetRegistry,
    }

    fn fixture() -> Fixture {
        let handles = HandleTable::shared();
        Fixture {
            store: Arc::new(InMemoryContentStore::new()),
            registry: PendingAssetRegistry::new(Arc::clone(&handles)),
            handles,
        }
    }

    fn persister(store: &Arc<InMemoryContentStore>, config: PersistConfig) -> Persister {
        Persister::new(
            store.clone(),
            PersistConfig {
                retry_backoff: Duration::from_millis(1),
                ..config
            },
        )
    }

    fn png(tag: u8) -> Payload {
        Payload::new(vec![0x89, b'P', b'N', b'G', tag], "image/png")
    }

    fn has_references(tree: &Node) -> bool {
        !collect_strings(tree, EphemeralRef::is_reference).is_empty()
    }

    // -----------------------------------------------------------------------
    // Deduplication and rewriting
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn shared_reference_uploads_once() {
        let mut fx = fixture();
        let a = fx.registry.add(png(1)).unwrap();
        let tree = Node::from_json(&json!({"cover": a.as_str(), "thumb": a.as_str()}));

        let out = persister(&fx.store, PersistConfig::default())
            .persist(&tree, &fx.registry, &NoProgress)
            .await
            .unwrap();

        assert_eq!(fx.store.upload_calls(), 1);
        assert_eq!(out.report.uploaded(), 1);
        let url = &out.report.assets[&a].url;
        assert_eq!(out.tree.to_json().unwrap(), json!({"cover": url, "thumb": url}));
    }

    #[tokio::test]
    async fn reference_in_many_positions_uploads_once() {
        let mut fx = fixture();
        let a = fx.registry.add(png(1)).unwrap();
        let b = fx.registry.add(png(2)).unwrap();
        let tree = Node::from_json(&json!({
            "pages": [
                {"bg": a.as_str(), "layers": [a.as_str(), b.as_str()]},
                {"bg": a.as_str()}
            ],
            "thumb": b.as_str()
        }));

        let out = persister(&fx.store, PersistConfig::default())
            .persist(&tree, &fx.registry, &NoProgress)
            .await
            .unwrap();

        assert_eq!(fx.store.upload_calls(), 2);
        assert!(!has_references(&out.tree));
        let pages = out.tree.get("pages").unwrap();
        assert_eq!(
            pages.at(1).unwrap().get("bg").unwrap().as_str(),
            Some(out.report.assets[&a].url.as_str())
        );
    }

    #[tokio::test]
    async fn video_descriptor_is_refreshed_together() {
        let mut fx = fixture();
        let clip = Payload::new(vec![7; 64], "video/mp4");
        let b = fx.registry.add(clip).unwrap();
        let tree = Node::from_json(&json!({
            "clip": {
                "type": "video",
                "url": b.as_str(),
                "mirrorUrl": b.as_str(),
                "storageKey": null,
                "contentType": null,
                "size": null
            }
        }));

        let out = persister(&fx.store, PersistConfig::default().with_path_hint("c1"))
            .persist(&tree, &fx.registry, &NoProgress)
            .await
            .unwrap();

        assert_eq!(fx.store.upload_calls(), 1);
        let asset = &out.report.assets[&b];
        assert!(asset.storage_key.starts_with("c1/asset_"));
        assert!(asset.storage_key.ends_with(".mp4"));
        assert_eq!(
            out.tree.to_json().unwrap(),
            json!({
                "clip": {
                    "type": "video",
                    "url": asset.url,
                    "mirrorUrl": asset.url,
                    "storageKey": asset.storage_key,
                    "contentType": "video/mp4",
                    "size": 64
                }
            })
        );
    }

    #[tokio::test]
    async fn input_tree_and_registry_are_untouched() {
        let mut fx = fixture();
        let a = fx.registry.add(png(1)).unwrap();
        let tree = Node::from_json(&json!({"cover": a.as_str()}));

        persister(&fx.store, PersistConfig::default())
            .persist(&tree, &fx.registry, &NoProgress)
            .await
            .unwrap();

        assert_eq!(tree.get("cover").unwrap().as_str(), Some(a.as_str()));
        assert!(fx.registry.contains(a.as_str()));
        assert!(fx.handles.is_live(a.as_str()));
        assert_eq!(fx.handles.live_count(), 1);
    }

    #[tokio::test]
    async fn cyclic_tree_terminates() {
        let mut fx = fixture();
        let a = fx.registry.add(png(1)).unwrap();
        let root = Node::mapping([("cover", Node::string(a.as_str()))]);
        root.insert("self", root.clone());

        let out = persister(&fx.store, PersistConfig::default())
            .persist(&root, &fx.registry, &NoProgress)
            .await
            .unwrap();

        assert_eq!(fx.store.upload_calls(), 1);
        let copied_self = out.tree.get("self").unwrap();
        assert!(copied_self.ptr_eq(&out.tree));
        assert!(!copied_self.ptr_eq(&root));
        assert!(!has_references(&out.tree));

        root.insert("self", Node::Null);
        out.tree.insert("self", Node::Null);
    }

    #[tokio::test]
    async fn tree_without_assets_is_copied() {
        let fx = fixture();
        let tree = Node::from_json(&json!({"title": "Spring", "pages": [1, 2]}));
        let out = persister(&fx.store, PersistConfig::default())
            .persist(&tree, &fx.registry, &NoProgress)
            .await
            .unwrap();
        assert_eq!(fx.store.upload_calls(), 0);
        assert_eq!(out.tree.to_json().unwrap(), tree.to_json().unwrap());
        assert!(!out.tree.ptr_eq(&tree));
        assert_eq!(out.report, PersistReport::default());
    }

    // -----------------------------------------------------------------------
    // Inline payloads
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn inline_payloads_are_uploaded_and_revoked() {
        let fx = fixture();
        let inline = "data:image/png;base64,iVBORw0KGgo=";
        let tree = Node::from_json(&json!({"logo": inline, "favicon": inline}));

        let out = persister(&fx.store, PersistConfig::default())
            .persist(&tree, &fx.registry, &NoProgress)
            .await
            .unwrap();

        assert_eq!(out.report.inlined, 1);
        assert_eq!(fx.store.upload_calls(), 1);
        let url = out.tree.get("logo").unwrap().as_str().unwrap().to_string();
        assert_eq!(out.tree.get("favicon").unwrap().as_str(), Some(url.as_str()));

        let key = url.strip_prefix("https://store.local/").unwrap();
        assert_eq!(fx.store.get(key).unwrap().data().as_ref(), b"\x89PNG\r\n\x1a\n");
        assert_eq!(fx.handles.live_count(), 0);
        assert_eq!(fx.handles.stats().outstanding(), 0);
    }

    #[tokio::test]
    async fn malformed_inline_payload_is_left_alone() {
        let fx = fixture();
        let tree = Node::from_json(&json!({"logo": "data:image/png;base64,@@@"}));

        let out = persister(&fx.store, PersistConfig::default())
            .persist(&tree, &fx.registry, &NoProgress)
            .await
            .unwrap();

        assert_eq!(out.report.inlined, 0);
        assert_eq!(fx.store.upload_calls(), 0);
        assert_eq!(out.tree.get("logo").unwrap().as_str(), Some("data:image/png;base64,@@@"));
    }

    // -----------------------------------------------------------------------
    // Failure handling
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn one_failed_upload_fails_the_run() {
        let mut fx = fixture();
        let good = fx.registry.add(png(1)).unwrap();
        let bad = fx.registry.add(png(2)).unwrap();
        fx.store.fail_uploads_of(png(2).data().clone());
        let tree = Node::from_json(&json!({
            "a": good.as_str(),
            "b": bad.as_str(),
            "c": "data:text/plain,hi"
        }));

        let err = persister(&fx.store, PersistConfig::no_retry())
            .persist(&tree, &fx.registry, &NoProgress)
            .await
            .unwrap_err();

        match err {
            PipelineError::UploadFailure { reference, attempts, .. } => {
                assert_eq!(reference, bad);
                assert_eq!(attempts, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Caller state is intact and the inline reference was released.
        assert_eq!(tree.get("b").unwrap().as_str(), Some(bad.as_str()));
        assert_eq!(fx.registry.len(), 2);
        assert_eq!(fx.handles.live_count(), 2);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let mut fx = fixture();
        let a = fx.registry.add(png(1)).unwrap();
        fx.store.fail_next_uploads(2);
        let tree = Node::from_json(&json!({"cover": a.as_str()}));

        let out = persister(&fx.store, PersistConfig::default())
            .persist(&tree, &fx.registry, &NoProgress)
            .await
            .unwrap();

        assert_eq!(fx.store.upload_calls(), 3);
        assert_eq!(out.report.uploaded(), 1);
    }

    #[tokio::test]
    async fn retry_budget_is_bounded() {
        let mut fx = fixture();
        let a = fx.registry.add(png(1)).unwrap();
        fx.store.fail_next_uploads(3);
        let tree = Node::from_json(&json!({"cover": a.as_str()}));

        let err = persister(&fx.store, PersistConfig::default())
            .persist(&tree, &fx.registry, &NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::UploadFailure { attempts: 3, .. }));
        assert_eq!(fx.store.upload_calls(), 3);
    }

    #[tokio::test]
    async fn unknown_reference_fails_before_upload() {
        let mut fx = fixture();
        let a = fx.registry.add(png(1)).unwrap();
        let tree = Node::from_json(&json!({"a": a.as_str(), "ghost": "blob:tessera/ghost"}));

        let err = persister(&fx.store, PersistConfig::default())
            .persist(&tree, &fx.registry, &NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::UnresolvedReference(ref r) if r == "blob:tessera/ghost"));
        assert_eq!(fx.store.upload_calls(), 0);
    }

    #[tokio::test]
    async fn foreign_blob_urls_pass_through() {
        let mut fx = fixture();
        let a = fx.registry.add(png(1)).unwrap();
        let tree = Node::from_json(&json!({
            "a": a.as_str(),
            "preview": "blob:https://app.example/550e8400",
            "note": "blob: notes"
        }));

        let out = persister(&fx.store, PersistConfig::default())
            .persist(&tree, &fx.registry, &NoProgress)
            .await
            .unwrap();

        assert_eq!(fx.store.upload_calls(), 1);
        let json = out.tree.to_json().unwrap();
        assert_eq!(json["preview"], "blob:https://app.example/550e8400");
        assert_eq!(json["note"], "blob: notes");
    }

    // -----------------------------------------------------------------------
    // Progress
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn progress_is_reported_per_upload() {
        let mut fx = fixture();
        let refs: Vec<_> = (0..3).map(|i| fx.registry.add(png(i)).unwrap()).collect();
        let tree = Node::sequence(refs.iter().map(|r| Node::string(r.as_str())));
        let seen = Mutex::new(Vec::new());
        let sink = |p: Progress| seen.lock().unwrap().push(p);

        persister(&fx.store, PersistConfig::default())
            .persist(&tree, &fx.registry, &sink)
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|p| p.total == 3));
        assert_eq!(seen.last(), Some(&Progress::new(3, 3)));
    }
}
