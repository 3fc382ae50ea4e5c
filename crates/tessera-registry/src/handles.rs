use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tessera_types::EphemeralRef;

/// Live local handles backing ephemeral references.
///
/// This is the session runtime's equivalent of an object-URL table: minting
/// a reference acquires a handle, revoking it releases the handle. Every
/// registry of one editing session shares the same table through an `Arc`.
pub struct HandleTable {
    live: RwLock<HashSet<EphemeralRef>>,
    minted: AtomicU64,
    revoked: AtomicU64,
}

/// Lifetime counters of a [`HandleTable`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandleStats {
    pub minted: u64,
    pub revoked: u64,
}

impl HandleStats {
    /// Handles minted but not yet revoked.
    pub fn outstanding(&self) -> u64 {
        self.minted.saturating_sub(self.revoked)
    }
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            live: RwLock::new(HashSet::new()),
            minted: AtomicU64::new(0),
            revoked: AtomicU64::new(0),
        }
    }

    /// A new table behind an `Arc`, ready to be shared by registries.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Mint a fresh reference and mark its handle live.
    pub fn mint(&self) -> EphemeralRef {
        let reference = EphemeralRef::mint();
        // Counted before the handle is visible, so `revoked <= minted`.
        self.minted.fetch_add(1, Ordering::SeqCst);
        self.live
            .write()
            .expect("lock poisoned")
            .insert(reference.clone());
        reference
    }

    /// Release a handle. Returns `false` if it was not live (never minted
    /// here, or already revoked), in which case nothing happens.
    pub fn revoke(&self, reference: &str) -> bool {
        let removed = self.live.write().expect("lock poisoned").remove(reference);
        if removed {
            self.revoked.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    pub fn is_live(&self, reference: &str) -> bool {
        self.live.read().expect("lock poisoned").contains(reference)
    }

    pub fn live_count(&self) -> usize {
        self.live.read().expect("lock poisoned").len()
    }

    pub fn stats(&self) -> HandleStats {
        let revoked = self.revoked.load(Ordering::SeqCst);
        HandleStats {
            minted: self.minted.load(Ordering::SeqCst),
            revoked,
        }
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleTable")
            .field("live", &self.live_count())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_marks_live() {
        let table = HandleTable::new();
        let r = table.mint();
        assert!(table.is_live(r.as_str()));
        assert_eq!(table.live_count(), 1);
    }

    #[test]
    fn revoke_is_at_most_once() {
        let table = HandleTable::new();
        let r = table.mint();
        assert!(table.revoke(r.as_str()));
        assert!(!table.revoke(r.as_str()));
        assert!(!table.is_live(r.as_str()));
        assert_eq!(table.stats(), HandleStats { minted: 1, revoked: 1 });
    }

    #[test]
    fn revoke_unknown_is_noop() {
        let table = HandleTable::new();
        assert!(!table.revoke("blob:tessera/never-minted"));
        assert_eq!(table.stats().revoked, 0);
    }

    #[test]
    fn outstanding_tracks_live_handles() {
        let table = HandleTable::new();
        let a = table.mint();
        let _b = table.mint();
        table.revoke(a.as_str());
        assert_eq!(table.stats().outstanding(), 1);
        assert_eq!(table.live_count(), 1);
    }

    #[test]
    fn outstanding_never_underflows() {
        assert_eq!(HandleStats { minted: 1, revoked: 2 }.outstanding(), 0);
    }

    #[test]
    fn stats_stay_consistent_under_concurrent_revoke() {
        use std::thread;

        let table = HandleTable::shared();
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let r = table.mint();
                        assert!(table.revoke(r.as_str()));
                    }
                })
            })
            .collect();
        for _ in 0..1_000 {
            let stats = table.stats();
            assert!(stats.revoked <= stats.minted);
            let _ = stats.outstanding();
        }
        for w in workers {
            w.join().expect("thread should not panic");
        }
        assert_eq!(table.stats(), HandleStats { minted: 800, revoked: 800 });
        assert_eq!(table.stats().outstanding(), 0);
    }

    #[test]
    fn concurrent_minting_yields_unique_refs() {
        use std::thread;

        let table = HandleTable::shared();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                thread::spawn(move || (0..50).map(|_| table.mint()).collect::<Vec<_>>())
            })
            .collect();
        let mut all = HashSet::new();
        for h in handles {
            for r in h.join().expect("thread should not panic") {
                assert!(all.insert(r));
            }
        }
        assert_eq!(table.live_count(), 400);
    }
}
