//! Foundation types for Tessera.
//!
//! Every other Tessera crate depends on `tessera-types`. The types here carry
//! no behaviour beyond validation and formatting; moving assets around is the
//! job of the registry, store, and pipeline crates.
//!
//! # Key Types
//!
//! - [`Payload`]: raw binary content plus a content-type tag
//! - [`EphemeralRef`]: session-local token standing in for a payload
//! - [`PermanentAsset`]: durable descriptor returned by the content store
//! - [`Progress`]: `{completed, total}` transfer counter

pub mod asset;
pub mod content_type;
pub mod error;
pub mod payload;
pub mod progress;
pub mod reference;

pub use asset::{trailing_segment, PermanentAsset};
pub use content_type::{extension_for, parse_content_type, DEFAULT_CONTENT_TYPE};
pub use error::{TypeError, TypeResult};
pub use payload::Payload;
pub use progress::Progress;
pub use reference::{EphemeralRef, REFERENCE_PREFIX, REFERENCE_SCHEME};
