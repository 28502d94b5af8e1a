//! Published snapshot store.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use tesouro_traits::{lookup_key, BondRecord};

use crate::snapshot::Snapshot;

/// Result of a "list all" read.
#[derive(Debug, Clone, Serialize)]
pub struct BondListing {
    /// Bonds in listing order
    pub bonds: Vec<BondRecord>,
    /// Timestamp of the snapshot the bonds came from
    pub updated_at: Option<String>,
}

/// Result of a "get by name" read.
#[derive(Debug, Clone, Serialize)]
pub struct BondLookup {
    /// The matching bond
    pub bond: BondRecord,
    /// Timestamp of the snapshot the bond came from
    pub updated_at: Option<String>,
}

/// Holds exactly one published [`Snapshot`].
///
/// The lock guards an `Arc` handle, not the data: readers clone the handle
/// and release the lock immediately, the writer holds it only for the swap.
/// Fetching and parsing never happen under the lock.
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// Create a store holding the empty snapshot.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// Replace the published snapshot. Returns the new generation.
    pub fn publish(&self, snapshot: Snapshot) -> u64 {
        let mut current = self.current.write();
        let generation = current.generation() + 1;
        let previous = std::mem::replace(
            &mut *current,
            Arc::new(snapshot.with_generation(generation)),
        );
        drop(current);

        debug!(
            generation,
            replaced = previous.generation(),
            "Published bond snapshot"
        );
        generation
    }

    /// Handle to the currently published snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// All bonds of the current snapshot, in listing order.
    pub fn get_all(&self) -> BondListing {
        let snapshot = self.current();
        BondListing {
            bonds: snapshot.bonds().to_vec(),
            updated_at: snapshot.updated_at().map(str::to_string),
        }
    }

    /// Find a bond by name.
    ///
    /// Matching is case-insensitive and `_`/`-` in `name` match spaces.
    pub fn get_by_name(&self, name: &str) -> Option<BondLookup> {
        let snapshot = self.current();
        snapshot
            .get_by_key(&lookup_key(name))
            .map(|bond| BondLookup {
                bond: bond.clone(),
                updated_at: snapshot.updated_at().map(str::to_string),
            })
    }

    /// Generation of the current snapshot; 0 until the first publish.
    pub fn generation(&self) -> u64 {
        self.current.read().generation()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
