use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored campaign: its name and persisted state tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRecord {
    pub id: String,
    pub name: String,
    /// Persisted tree. Assets appear only as durable urls.
    pub tree: Value,
    pub updated_at: DateTime<Utc>,
}

/// Listing entry for a campaign, without its tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSummary {
    pub id: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&CampaignRecord> for CampaignSummary {
    fn from(record: &CampaignRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            updated_at: record.updated_at,
        }
    }
}
