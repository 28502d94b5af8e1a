//! Upstream source trait.
//!
//! An upstream deployment publishes bond prices either as a single JSON
//! document or as two `;`-delimited datasets. Each shape is a [`BondSource`]
//! strategy; the acquirer only sees the trait.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::bond::{BondRecord, InvestQuote, RedeemQuote};
use crate::error::SourceError;

/// Source shape selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Single JSON document with a business timestamp
    Json,
    /// Investable + redeemable delimited datasets
    Csv,
}

impl SourceKind {
    /// Returns the string identifier for this source kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    /// Parses a source kind from its string identifier.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bodies downloaded in one fetch, not yet decoded.
#[derive(Debug, Clone)]
pub enum RawDatasets {
    /// The JSON document
    Json(Bytes),
    /// The two delimited documents
    Delimited {
        /// "Investable" dataset
        investable: Bytes,
        /// "Redeemable" dataset
        redeemable: Bytes,
    },
}

/// Decoded datasets, ready to become a snapshot.
#[derive(Debug, Clone)]
pub enum ParsedBonds {
    /// Already one record per bond, in upstream order.
    Unified {
        /// Bonds in upstream order
        bonds: Vec<BondRecord>,
        /// Upstream business-status timestamp
        business_time: String,
    },
    /// Separate rows that still need merging by name.
    Split {
        /// Rows of the investable dataset
        invest: Vec<InvestQuote>,
        /// Rows of the redeemable dataset
        redeem: Vec<RedeemQuote>,
    },
}

impl ParsedBonds {
    /// Number of decoded rows across datasets.
    pub fn row_count(&self) -> usize {
        match self {
            ParsedBonds::Unified { bonds, .. } => bonds.len(),
            ParsedBonds::Split { invest, redeem } => invest.len() + redeem.len(),
        }
    }
}

/// An upstream bond price source.
///
/// `fetch` does the I/O, `parse` is pure so it can be exercised on fixtures.
#[async_trait]
pub trait BondSource: Send + Sync {
    /// Source shape.
    fn kind(&self) -> SourceKind;

    /// Download the raw dataset(s).
    async fn fetch(&self) -> Result<RawDatasets, SourceError>;

    /// Decode previously fetched dataset(s).
    fn parse(&self, raw: RawDatasets) -> Result<ParsedBonds, SourceError>;
}
