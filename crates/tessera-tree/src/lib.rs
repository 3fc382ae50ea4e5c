//! State trees for Tessera.
//!
//! A state tree is an arbitrary nesting of ordered sequences and key-ordered
//! mappings terminating in string, number, boolean, or null leaves. Container
//! nodes are shared handles: the same mapping may be reachable from several
//! places, or from itself.
//!
//! # Design Rules
//!
//! 1. Container identity is the handle, never the value. Two structurally
//!    equal mappings are distinct nodes.
//! 2. [`traverse`] is pre-order and rewrites in place. It never copies the
//!    tree; callers that must not disturb their input walk a
//!    [`Node::deep_copy`].
//! 3. No lock is held while a visitor runs or while the walker recurses, so
//!    visitors may freely inspect the value they are handed.
//! 4. Every walk guards against revisiting a container, so cycles terminate.
//!
//! Cyclic trees keep themselves alive (reference counting cannot free a
//! cycle); break the cycle before dropping the last handle if that matters.

pub mod collect;
pub mod error;
pub mod json;
pub mod node;
pub mod traverse;

pub use collect::collect_strings;
pub use error::{TreeError, TreeResult};
pub use node::{Mapping, Node, NodeId, Sequence, Shared};
pub use traverse::{traverse, Key, Owner};
