//! Content-store backends for Tessera.
//!
//! The content store is the durable home of every asset. The pipelines only
//! ever talk to it through the [`ContentStore`] trait: upload a payload and
//! get back a [`PermanentAsset`](tessera_types::PermanentAsset), download a
//! url and get back a [`Payload`](tessera_types::Payload).
//!
//! # Storage Backends
//!
//! - [`InMemoryContentStore`] -- `HashMap`-based store for tests and embedding,
//!   with call counters and failure injection
//! - [`FsContentStore`] -- directory-backed store with JSON metadata sidecars
//! - [`HttpContentStore`] -- remote store over HTTP, downloads through a
//!   same-origin proxy
//!
//! # Design Rules
//!
//! 1. Uploaded assets are immutable; the store never rewrites an object.
//! 2. A store recognises its own urls (`owns_url`); the hydrator downloads
//!    only those.
//! 3. Errors are propagated, never swallowed. Retrying is the caller's call.

pub mod error;
pub mod fs;
pub mod http;
pub mod key;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsContentStore;
pub use http::{HttpContentStore, HttpStoreConfig};
pub use key::{storage_key, validate_key};
pub use memory::InMemoryContentStore;
pub use traits::ContentStore;
