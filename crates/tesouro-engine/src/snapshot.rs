//! Immutable bond snapshot.

use std::collections::HashMap;

use tesouro_traits::{bond_key, BondRecord};

/// One complete, point-in-time view of all known bonds.
///
/// Built once per successful fetch cycle and never mutated afterwards; the
/// store hands out `Arc<Snapshot>` so readers keep a consistent view for as
/// long as they hold it.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Bonds in listing order
    bonds: Vec<BondRecord>,
    /// Lowercased name -> position in `bonds`
    index: HashMap<String, usize>,
    /// Business timestamp or acquisition time
    updated_at: Option<String>,
    /// Publish counter, stamped by the store
    generation: u64,
}

impl Snapshot {
    /// The snapshot served before the first successful cycle.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from bonds already in listing order.
    ///
    /// Names that collide case-insensitively collapse into one entry: the
    /// later record wins but keeps the position of the first.
    pub fn from_ordered(bonds: Vec<BondRecord>, updated_at: impl Into<String>) -> Self {
        let mut ordered: Vec<BondRecord> = Vec::with_capacity(bonds.len());
        let mut index = HashMap::with_capacity(bonds.len());

        for bond in bonds {
            let key = bond.key();
            if let Some(&pos) = index.get(&key) {
                ordered[pos] = bond;
            } else {
                index.insert(key, ordered.len());
                ordered.push(bond);
            }
        }

        Self {
            bonds: ordered,
            index,
            updated_at: Some(updated_at.into()),
            generation: 0,
        }
    }

    /// Bonds in listing order.
    pub fn bonds(&self) -> &[BondRecord] {
        &self.bonds
    }

    /// Look up a bond by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&BondRecord> {
        self.get_by_key(&bond_key(name))
    }

    /// Look up a bond by an already-lowercased key.
    pub fn get_by_key(&self, key: &str) -> Option<&BondRecord> {
        self.index.get(key).map(|&pos| &self.bonds[pos])
    }

    /// When this snapshot was produced, `None` before the first publish.
    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    /// Publish counter; 0 for a snapshot that was never published.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of bonds.
    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    /// Whether the snapshot holds no bonds.
    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }
}
