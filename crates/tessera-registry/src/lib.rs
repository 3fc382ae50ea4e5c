//! Session-scoped pending asset registry.
//!
//! The registry is the sole authority for creating and revoking ephemeral
//! references. Each reference is backed by a live handle in a shared
//! [`HandleTable`]; removing an entry releases its handle, and dropping or
//! closing a registry releases every handle it still owns.
//!
//! # Design Rules
//!
//! 1. Exactly one payload per live reference.
//! 2. A handle is revoked at most once.
//! 3. Removing an unknown reference is a warning, never an error.
//! 4. No registry is dropped with live entries: `Drop` revokes them.

pub mod error;
pub mod handles;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use handles::{HandleStats, HandleTable};
pub use registry::PendingAssetRegistry;
