use std::collections::HashMap;
use std::sync::Arc;

use tessera_types::{EphemeralRef, Payload};

use crate::error::{RegistryError, RegistryResult};
use crate::handles::HandleTable;

/// Mapping from ephemeral references to payloads for one editing session.
///
/// Mutating operations take `&mut self`: the registry is owned by a single
/// editing context at a time.
pub struct PendingAssetRegistry {
    handles: Arc<HandleTable>,
    entries: HashMap<EphemeralRef, Payload>,
}

impl PendingAssetRegistry {
    /// Create an empty registry minting through `handles`.
    pub fn new(handles: Arc<HandleTable>) -> Self {
        Self {
            handles,
            entries: HashMap::new(),
        }
    }

    /// The handle table backing this registry's references.
    pub fn handles(&self) -> &Arc<HandleTable> {
        &self.handles
    }

    /// Register a payload under a fresh reference.
    ///
    /// Fails with [`RegistryError::Validation`] if the payload's content type
    /// is not a concrete MIME type. Nothing is minted on failure.
    pub fn add(&mut self, payload: Payload) -> RegistryResult<EphemeralRef> {
        payload
            .mime()
            .map_err(|e| RegistryError::Validation(e.to_string()))?;

        let reference = self.handles.mint();
        tracing::debug!(%reference, size = payload.size(), content_type = payload.content_type(), "registered pending asset");
        self.entries.insert(reference.clone(), payload);
        Ok(reference)
    }

    /// Merge every entry of `other` into this registry.
    ///
    /// Ownership of the merged handles moves here; `other` is left empty, so
    /// dropping it revokes nothing. Returns the number of merged entries.
    pub fn add_many(&mut self, mut other: PendingAssetRegistry) -> RegistryResult<usize> {
        if !Arc::ptr_eq(&self.handles, &other.handles) {
            return Err(RegistryError::ForeignHandles);
        }
        let merged = other.entries.len();
        self.entries.extend(other.entries.drain());
        tracing::debug!(merged, total = self.entries.len(), "merged asset map");
        Ok(merged)
    }

    /// Release a reference's handle and forget its payload.
    ///
    /// Unknown references are a no-op that logs a warning, so double calls
    /// from independent code paths are harmless. Returns whether an entry was
    /// removed.
    pub fn remove(&mut self, reference: &str) -> bool {
        match self.entries.remove_entry(reference) {
            Some((reference, _payload)) => {
                self.release(&reference);
                tracing::debug!(%reference, "removed and revoked pending asset");
                true
            }
            None => {
                let diagnostic = RegistryError::UnknownReference(reference.to_string());
                tracing::warn!("{diagnostic}; ignoring remove");
                false
            }
        }
    }

    pub fn get(&self, reference: &str) -> Option<&Payload> {
        self.entries.get(reference)
    }

    /// The tracked reference and its payload.
    pub fn entry(&self, reference: &str) -> Option<(&EphemeralRef, &Payload)> {
        self.entries.get_key_value(reference)
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.entries.contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All tracked references, sorted.
    pub fn references(&self) -> Vec<EphemeralRef> {
        let mut refs: Vec<EphemeralRef> = self.entries.keys().cloned().collect();
        refs.sort();
        refs
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EphemeralRef, &Payload)> {
        self.entries.iter()
    }

    /// Total payload bytes held by the registry.
    pub fn total_bytes(&self) -> u64 {
        self.entries.values().map(Payload::size).sum()
    }

    /// Tear the registry down, revoking every remaining reference. Returns
    /// the number of revoked entries.
    pub fn close(mut self) -> usize {
        self.revoke_all()
    }

    fn revoke_all(&mut self) -> usize {
        let count = self.entries.len();
        for (reference, _payload) in self.entries.drain() {
            if self.handles.revoke(reference.as_str()) {
                tracing::trace!(%reference, "revoked at teardown");
            }
        }
        if count > 0 {
            tracing::debug!(count, "registry teardown revoked remaining assets");
        }
        count
    }

    fn release(&self, reference: &EphemeralRef) {
        if !self.handles.revoke(reference.as_str()) {
            tracing::debug!(%reference, "handle already released");
        }
    }
}

impl Drop for PendingAssetRegistry {
    fn drop(&mut self) {
        self.revoke_all();
    }
}

impl std::fmt::Debug for PendingAssetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAssetRegistry")
            .field("entries", &self.entries.len())
            .field("total_bytes", &self.total_bytes())
            .finish()
    }
}
