//! # Tesouro Traits
//!
//! Data model and trait definitions for the Tesouro rates service.
//!
//! This crate contains ONLY the shared vocabulary with ZERO runtime dependencies.
//! Upstream implementations live in extension crates (`tesouro-ext-http`) and
//! the snapshot machinery lives in `tesouro-engine`.
//!
//! ## Module Structure
//!
//! - [`bond`]: The normalized [`BondRecord`] plus the per-dataset quote rows
//! - [`source`]: The [`BondSource`] strategy trait and its raw/parsed payloads
//! - [`error`]: [`SourceError`], the failure taxonomy of a fetch cycle
//!
//! ## Dependency Injection
//!
//! The acquirer consumes a source through the trait object:
//!
//! ```ignore
//! let source: Arc<dyn BondSource> = Arc::new(JsonBondSource::new(client, url));
//! let acquirer = Acquirer::new(source, store, settings);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bond;
pub mod error;
pub mod source;

// Re-export commonly used types
pub use bond::{bond_key, lookup_key, BondRecord, InvestQuote, Rate, RedeemQuote};
pub use error::SourceError;
pub use source::{BondSource, ParsedBonds, RawDatasets, SourceKind};
