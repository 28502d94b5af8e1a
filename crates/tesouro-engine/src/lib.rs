//! # Tesouro Engine
//!
//! The fetch-normalize-publish cycle of the Tesouro rates service.
//!
//! This crate provides:
//! - [`Snapshot`]: One immutable, point-in-time view of all known bonds
//! - [`SnapshotStore`]: Holds the published snapshot and serves concurrent readers
//! - [`SortPriority`] and [`build_snapshot`]: Merge and ordering of parsed datasets
//! - [`ScrapeGate`]: Weekday/hour window in the upstream's business time zone
//! - [`Acquirer`]: Scheduled loop that fetches, parses and publishes
//! - [`Shutdown`]: Process-wide cancellation signal
//!
//! ## Architecture
//!
//! ```text
//! BondSource ─> fetch ─> parse ─> build_snapshot ─> SnapshotStore::publish
//!     ▲                                                   │
//!     │ (gated interval)                                  ▼
//!  Acquirer                                    get_all / get_by_name
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let store = Arc::new(SnapshotStore::new());
//! let acquirer = Acquirer::new(source, store.clone(), settings);
//! let shutdown = Shutdown::new();
//!
//! tokio::spawn({
//!     let shutdown = shutdown.clone();
//!     async move { acquirer.run(shutdown).await }
//! });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod acquirer;
pub mod gate;
pub mod merge;
pub mod runtime;
pub mod snapshot;
pub mod store;

// Re-exports
pub use acquirer::{Acquirer, AcquirerSettings};
pub use gate::ScrapeGate;
pub use merge::{build_snapshot, merge_datasets, SortPriority};
pub use runtime::Shutdown;
pub use snapshot::Snapshot;
pub use store::{BondListing, BondLookup, SnapshotStore};
