//! The [`CampaignRepository`] trait and its in-memory backend.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::campaign::{CampaignRecord, CampaignSummary};
use crate::error::{SdkError, SdkResult};

/// Storage backend for campaign records.
///
/// Trees handed to a repository are already persisted: they hold durable
/// urls only, never ephemeral references.
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Store a new campaign and return it with its assigned id.
    async fn create(&self, name: &str, tree: &Value) -> SdkResult<CampaignRecord>;

    /// Replace the name and tree of an existing campaign.
    ///
    /// Fails with [`SdkError::CampaignNotFound`] if `id` is unknown.
    async fn update(&self, id: &str, name: &str, tree: &Value) -> SdkResult<CampaignRecord>;

    async fn load(&self, id: &str) -> SdkResult<CampaignRecord>;

    async fn delete(&self, id: &str) -> SdkResult<()>;

    /// All campaigns, most recently updated first.
    async fn list(&self) -> SdkResult<Vec<CampaignSummary>>;
}

/// In-memory [`CampaignRepository`]. Data is lost when it is dropped.
#[derive(Debug, Default)]
pub struct InMemoryCampaignRepository {
    records: RwLock<HashMap<String, CampaignRecord>>,
}

impl InMemoryCampaignRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> SdkError {
    SdkError::Repository(format!("lock poisoned: {e}"))
}

#[async_trait]
impl CampaignRepository for InMemoryCampaignRepository {
    async fn create(&self, name: &str, tree: &Value) -> SdkResult<CampaignRecord> {
        let record = CampaignRecord {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            tree: tree.clone(),
            updated_at: Utc::now(),
        };
        self.records
            .write()
            .map_err(poisoned)?
            .insert(record.id.clone(), record.clone());
        tracing::debug!(id = %record.id, "created campaign");
        Ok(record)
    }

    async fn update(&self, id: &str, name: &str, tree: &Value) -> SdkResult<CampaignRecord> {
        let mut records = self.records.write().map_err(poisoned)?;
        let record = records
            .get_mut(id)
            .ok_or_else(|| SdkError::CampaignNotFound(id.to_string()))?;
        record.name = name.to_string();
        record.tree = tree.clone();
        record.updated_at = Utc::now();
        tracing::debug!(%id, "updated campaign");
        Ok(record.clone())
    }

    async fn load(&self, id: &str) -> SdkResult<CampaignRecord> {
        self.records
            .read()
            .map_err(poisoned)?
            .get(id)
            .cloned()
            .ok_or_else(|| SdkError::CampaignNotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> SdkResult<()> {
        match self.records.write().map_err(poisoned)?.remove(id) {
            Some(_) => Ok(()),
            None => Err(SdkError::CampaignNotFound(id.to_string())),
        }
    }

    async fn list(&self) -> SdkResult<Vec<CampaignSummary>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut summaries: Vec<CampaignSummary> = records.values().map(CampaignSummary::from).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }
}
