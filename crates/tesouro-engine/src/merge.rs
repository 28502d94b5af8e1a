//! Turning parsed datasets into a snapshot.
//!
//! The delimited upstream splits every bond across an "investable" and a
//! "redeemable" dataset. [`merge_datasets`] joins them by lowercased name and
//! [`SortPriority`] puts the result in a stable listing order.

use std::cmp::Ordering;
use std::collections::HashMap;

use tesouro_traits::{bond_key, BondRecord, InvestQuote, ParsedBonds, RedeemQuote};

use crate::snapshot::Snapshot;

// =============================================================================
// SORT PRIORITY
// =============================================================================

/// Listing order by configured name prefixes.
///
/// A bond ranks at the first prefix its name starts with (case-insensitive);
/// names matching no prefix rank last. Equal ranks sort by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortPriority {
    prefixes: Vec<String>,
}

impl SortPriority {
    /// Create a priority list. Earlier prefixes sort first.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.into().to_lowercase())
                .collect(),
        }
    }

    /// Rank of a name: index of the first matching prefix, or the prefix count.
    pub fn rank(&self, name: &str) -> usize {
        let name = name.to_lowercase();
        self.prefixes
            .iter()
            .position(|prefix| name.starts_with(prefix.as_str()))
            .unwrap_or(self.prefixes.len())
    }

    /// Compare two bonds by rank, then name.
    pub fn compare(&self, a: &BondRecord, b: &BondRecord) -> Ordering {
        self.rank(&a.name)
            .cmp(&self.rank(&b.name))
            .then_with(|| a.name.cmp(&b.name))
    }

    /// Sort bonds in place.
    pub fn sort(&self, bonds: &mut [BondRecord]) {
        bonds.sort_by_cached_key(|b| (self.rank(&b.name), b.name.clone()));
    }
}

// =============================================================================
// MERGE
// =============================================================================

/// Join investment and redemption rows by lowercased name.
///
/// Redemption rows go in first; investment rows then mark their bond
/// investable and overwrite the investment-side fields. The result is
/// unordered.
pub fn merge_datasets(invest: Vec<InvestQuote>, redeem: Vec<RedeemQuote>) -> Vec<BondRecord> {
    let mut merged: HashMap<String, BondRecord> =
        HashMap::with_capacity(invest.len().max(redeem.len()));

    for quote in redeem {
        let key = bond_key(&quote.name);
        match merged.get_mut(&key) {
            Some(record) => record.apply_redeem(quote),
            None => {
                merged.insert(key, BondRecord::from(quote));
            }
        }
    }

    for quote in invest {
        merged
            .entry(bond_key(&quote.name))
            .or_insert_with(|| BondRecord::new(quote.name.clone()))
            .apply_invest(quote);
    }

    merged.into_values().collect()
}

/// Build the snapshot for one fetch cycle.
///
/// Unified documents keep upstream order and the upstream business timestamp.
/// Split datasets are merged, sorted by `priority` and stamped with
/// `acquired_at`.
pub fn build_snapshot(parsed: ParsedBonds, priority: &SortPriority, acquired_at: String) -> Snapshot {
    match parsed {
        ParsedBonds::Unified {
            bonds,
            business_time,
        } => Snapshot::from_ordered(bonds, business_time),
        ParsedBonds::Split { invest, redeem } => {
            let mut bonds = merge_datasets(invest, redeem);
            priority.sort(&mut bonds);
            Snapshot::from_ordered(bonds, acquired_at)
        }
    }
}
