//! High-level SDK for Tessera.
//!
//! [`EditingSession`] is the main entry point for applications: it owns the
//! live asset registry and the working tree, and runs the persist and
//! hydrate pipelines when a campaign is saved or loaded.

pub mod campaign;
pub mod error;
pub mod repository;
pub mod session;

pub use campaign::{CampaignRecord, CampaignSummary};
pub use error::{SdkError, SdkResult};
pub use repository::{CampaignRepository, InMemoryCampaignRepository};
pub use session::{EditingSession, LoadOutcome, SaveOutcome, SessionConfig};

// Re-export key types
pub use tessera_pipeline::{DownloadFailure, NoProgress, PersistReport, ProgressSink};
pub use tessera_registry::PendingAssetRegistry;
pub use tessera_store::{ContentStore, FsContentStore, HttpContentStore, InMemoryContentStore};
pub use tessera_tree::Node;
pub use tessera_types::{EphemeralRef, Payload, PermanentAsset, Progress};
