//! Editing sessions: one live registry, one working tree, save and load.

use std::sync::Arc;

use tessera_pipeline::{
    DownloadFailure, Hydrated, HydrateConfig, Hydrator, NoProgress, PersistConfig, PersistReport,
    Persister, ProgressSink,
};
use tessera_registry::{HandleTable, PendingAssetRegistry};
use tessera_store::ContentStore;
use tessera_tree::Node;
use tessera_types::{EphemeralRef, Payload};
use tracing::info;

use crate::campaign::{CampaignRecord, CampaignSummary};
use crate::error::SdkResult;
use crate::repository::CampaignRepository;

/// Pipeline settings used by an [`EditingSession`].
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    /// Base persist settings. The path hint is overridden with the campaign
    /// id once the campaign has one.
    pub persist: PersistConfig,
    pub hydrate: HydrateConfig,
}

/// Result of [`EditingSession::save`].
#[derive(Debug)]
pub struct SaveOutcome {
    pub record: CampaignRecord,
    pub report: PersistReport,
    /// Assets that could not be re-hydrated after saving.
    pub failures: Vec<DownloadFailure>,
}

/// Result of [`EditingSession::load`].
#[derive(Debug)]
pub struct LoadOutcome {
    pub record: CampaignRecord,
    pub failures: Vec<DownloadFailure>,
}

/// A campaign being edited.
///
/// The session owns the live [`PendingAssetRegistry`] and the working tree.
/// New assets are registered with [`add_asset`](Self::add_asset) and placed
/// in the tree by reference; [`save`](Self::save) moves them to the content
/// store and the repository.
pub struct EditingSession {
    store: Arc<dyn ContentStore>,
    repository: Arc<dyn CampaignRepository>,
    config: SessionConfig,
    handles: Arc<HandleTable>,
    registry: PendingAssetRegistry,
    tree: Node,
    campaign_id: Option<String>,
}

impl EditingSession {
    /// A session for a new, unsaved campaign with an empty tree.
    pub fn new(
        store: Arc<dyn ContentStore>,
        repository: Arc<dyn CampaignRepository>,
        config: SessionConfig,
    ) -> Self {
        let handles = HandleTable::shared();
        Self {
            store,
            repository,
            config,
            registry: PendingAssetRegistry::new(Arc::clone(&handles)),
            handles,
            tree: Node::mapping(Vec::<(String, Node)>::new()),
            campaign_id: None,
        }
    }

    /// Id of the campaign this session saves to, once it has been saved or
    /// loaded.
    pub fn campaign_id(&self) -> Option<&str> {
        self.campaign_id.as_deref()
    }

    pub fn tree(&self) -> &Node {
        &self.tree
    }

    pub fn set_tree(&mut self, tree: Node) {
        self.tree = tree;
    }

    pub fn registry(&self) -> &PendingAssetRegistry {
        &self.registry
    }

    pub fn handles(&self) -> &Arc<HandleTable> {
        &self.handles
    }

    /// Register a new asset. Place the returned reference in the tree.
    pub fn add_asset(&mut self, payload: Payload) -> SdkResult<EphemeralRef> {
        Ok(self.registry.add(payload)?)
    }

    /// Forget an asset and release its reference.
    pub fn remove_asset(&mut self, reference: &str) -> bool {
        self.registry.remove(reference)
    }

    /// Persist the working tree, store it, and continue editing from the
    /// stored version.
    ///
    /// `progress` reports the uploads only. On success the working tree and
    /// registry are replaced by a fresh hydration of the stored tree, and the
    /// previous registry is closed.
    /// On failure nothing is written to the repository and the session is
    /// unchanged.
    pub async fn save(&mut self, name: &str, progress: &dyn ProgressSink) -> SdkResult<SaveOutcome> {
        let mut persist_config = self.config.persist.clone();
        if let Some(id) = &self.campaign_id {
            persist_config.path_hint = Some(id.clone());
        }
        let persisted = Persister::new(Arc::clone(&self.store), persist_config)
            .persist(&self.tree, &self.registry, progress)
            .await?;
        let stored_tree = persisted.tree.to_json()?;

        let record = match &self.campaign_id {
            Some(id) => self.repository.update(id, name, &stored_tree).await?,
            None => self.repository.create(name, &stored_tree).await?,
        };
        info!(id = %record.id, uploaded = persisted.report.uploaded(), "campaign saved");

        let Hydrated { tree, assets, failures } = self
            .hydrator()
            .hydrate(&Node::from_json(&record.tree), &NoProgress)
            .await;
        let previous = std::mem::replace(&mut self.registry, assets);
        previous.close();
        self.tree = tree;
        self.campaign_id = Some(record.id.clone());

        Ok(SaveOutcome {
            record,
            report: persisted.report,
            failures,
        })
    }

    /// Load a stored campaign into this session.
    ///
    /// Hydrated assets are merged into the live registry and the working
    /// tree is replaced. Assets that failed to download keep their durable
    /// urls and are listed in the outcome.
    pub async fn load(&mut self, id: &str, progress: &dyn ProgressSink) -> SdkResult<LoadOutcome> {
        let record = self.repository.load(id).await?;
        let Hydrated { tree, assets, failures } = self
            .hydrator()
            .hydrate(&Node::from_json(&record.tree), progress)
            .await;

        let merged = self.registry.add_many(assets)?;
        self.tree = tree;
        self.campaign_id = Some(record.id.clone());
        info!(%id, assets = merged, failed = failures.len(), "campaign loaded");

        Ok(LoadOutcome { record, failures })
    }

    /// Delete a stored campaign. If it is the one being edited, the session
    /// keeps its state but will save as a new campaign.
    pub async fn delete(&mut self, id: &str) -> SdkResult<()> {
        self.repository.delete(id).await?;
        if self.campaign_id.as_deref() == Some(id) {
            self.campaign_id = None;
        }
        info!(%id, "campaign deleted");
        Ok(())
    }

    pub async fn campaigns(&self) -> SdkResult<Vec<CampaignSummary>> {
        self.repository.list().await
    }

    /// End the session, revoking every live reference. Returns the number
    /// of revoked assets.
    pub fn close(self) -> usize {
        self.registry.close()
    }

    fn hydrator(&self) -> Hydrator {
        Hydrator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.handles),
            self.config.hydrate.clone(),
        )
    }
}

impl std::fmt::Debug for EditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingSession")
            .field("campaign_id", &self.campaign_id)
            .field("registry", &self.registry)
            .finish()
    }
}
