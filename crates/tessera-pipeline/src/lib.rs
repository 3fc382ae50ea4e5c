//! Persist and hydrate pipelines for Tessera.
//!
//! A state tree moves between two representations. While a campaign is
//! being edited, its assets are ephemeral references into a
//! [`PendingAssetRegistry`](tessera_registry::PendingAssetRegistry). Once
//! persisted, they are durable urls served by a
//! [`ContentStore`](tessera_store::ContentStore).
//!
//! - [`Persister`] uploads every distinct pending asset (and every inline
//!   `data:` payload) and rewrites the tree to durable urls. All-or-nothing.
//! - [`Hydrator`] downloads every distinct durable url into a fresh registry
//!   and rewrites the tree to new references. Failures are per asset.
//!
//! # Design Rules
//!
//! 1. Each distinct asset is transferred once per run, however many
//!    positions hold it.
//! 2. Both pipelines work on a deep copy. The caller's tree and registry are
//!    never touched.
//! 3. All transfers of a run start together; the tree is rewritten only
//!    after every transfer has resolved.
//! 4. Typed mappings (`type: "video"`) have their descriptor fields
//!    refreshed together from one upload result.

pub mod config;
pub mod error;
pub mod hydrate;
pub mod inline;
pub mod naming;
pub mod persist;
pub mod progress;
pub mod rules;

pub use config::{HydrateConfig, PersistConfig};
pub use error::{DownloadFailure, InlineError, PipelineError, PipelineResult};
pub use hydrate::{Hydrated, Hydrator};
pub use inline::{decode_inline, is_inline};
pub use persist::{PersistReport, Persisted, Persister};
pub use progress::{NoProgress, ProgressSink};
pub use rules::AssetKind;
