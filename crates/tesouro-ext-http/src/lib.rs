//! # Tesouro Ext HTTP
//!
//! HTTP implementations of [`BondSource`](tesouro_traits::BondSource) for the
//! Tesouro rates service.
//!
//! This crate provides:
//! - [`BrowserClient`]: reqwest client presenting a desktop browser fingerprint
//! - [`JsonBondSource`]: single JSON document with a business timestamp
//! - [`CsvBondSource`]: "investable" + "redeemable" `;`-delimited datasets
//! - [`parse_brl`]: locale-formatted monetary amounts (`R$ 1.234,56`)
//!
//! Upstream rejects generic automated clients, so every request goes through
//! [`BrowserClient`].

#![warn(missing_docs)]
#![warn(clippy::all)]

mod amount;
mod client;
mod delimited;
mod json;

pub use amount::parse_brl;
pub use client::{BrowserClient, DEFAULT_TIMEOUT};
pub use delimited::{parse_invest_csv, parse_redeem_csv, CsvBondSource};
pub use json::{parse_json_document, JsonBondSource};
