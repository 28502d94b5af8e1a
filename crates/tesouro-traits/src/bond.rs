//! Bond data model.
//!
//! [`BondRecord`] is the unit the service publishes. The delimited upstream
//! ships investment and redemption prices as two separate datasets, read into
//! [`InvestQuote`] and [`RedeemQuote`] rows and merged by name.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// RATE
// =============================================================================

/// Annual rate descriptor.
///
/// The JSON upstream publishes plain numbers (`13.12`), the delimited one
/// publishes display strings (`IPCA + 5,79%`). Both are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rate {
    /// Numeric percentage
    Numeric(Decimal),
    /// Formatted text as shown by upstream
    Text(String),
}

impl Rate {
    /// Numeric value, if the rate is numeric.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Rate::Numeric(d) => Some(*d),
            Rate::Text(_) => None,
        }
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::Numeric(d)
    }
}

impl From<&str> for Rate {
    fn from(s: &str) -> Self {
        Rate::Text(s.to_string())
    }
}

// =============================================================================
// BOND RECORD
// =============================================================================

/// Normalized bond as published in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondRecord {
    /// Bond title, e.g. "Tesouro Selic 2029"
    pub name: String,
    /// Whether the bond is currently open for purchase
    pub investable: bool,
    /// Annual rate paid to buyers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_investment_rate: Option<Rate>,
    /// Annual rate applied on sell-back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_redemption_rate: Option<Rate>,
    /// Unit purchase price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unitary_investment_value: Option<Decimal>,
    /// Unit sell-back price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unitary_redemption_value: Option<Decimal>,
    /// Smallest accepted purchase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_investment_amount: Option<Decimal>,
    /// Smallest accepted sell-back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_redemption_value: Option<Decimal>,
    /// Maturity date as published upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maturity: Option<String>,
}

impl BondRecord {
    /// Create an empty, non-investable record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            investable: false,
            annual_investment_rate: None,
            annual_redemption_rate: None,
            unitary_investment_value: None,
            unitary_redemption_value: None,
            minimum_investment_amount: None,
            minimum_redemption_value: None,
            maturity: None,
        }
    }

    /// Lowercased name used as the snapshot key.
    pub fn key(&self) -> String {
        bond_key(&self.name)
    }

    /// Any investment-side field is populated.
    pub fn has_investment_data(&self) -> bool {
        self.annual_investment_rate.is_some()
            || self.unitary_investment_value.is_some()
            || self.minimum_investment_amount.is_some()
    }

    /// Any redemption-side field is populated.
    pub fn has_redemption_data(&self) -> bool {
        self.annual_redemption_rate.is_some()
            || self.unitary_redemption_value.is_some()
            || self.minimum_redemption_value.is_some()
    }

    /// Overlay an investment row: marks the bond investable and overwrites
    /// the investment-side fields. Redemption fields are left alone.
    pub fn apply_invest(&mut self, quote: InvestQuote) {
        self.name = quote.name;
        self.investable = true;
        self.annual_investment_rate = Some(quote.annual_investment_rate);
        self.unitary_investment_value = Some(quote.unitary_investment_value);
        self.minimum_investment_amount = Some(quote.minimum_investment_amount);
        if quote.maturity.is_some() {
            self.maturity = quote.maturity;
        }
    }

    /// Overlay a redemption row.
    pub fn apply_redeem(&mut self, quote: RedeemQuote) {
        self.annual_redemption_rate = Some(quote.annual_redemption_rate);
        self.unitary_redemption_value = Some(quote.unitary_redemption_value);
        if self.maturity.is_none() {
            self.maturity = quote.maturity;
        }
    }
}

impl From<RedeemQuote> for BondRecord {
    fn from(quote: RedeemQuote) -> Self {
        let mut record = BondRecord::new(quote.name.clone());
        record.apply_redeem(quote);
        record
    }
}

impl From<InvestQuote> for BondRecord {
    fn from(quote: InvestQuote) -> Self {
        let mut record = BondRecord::new(quote.name.clone());
        record.apply_invest(quote);
        record
    }
}

// =============================================================================
// DATASET ROWS
// =============================================================================

/// One row of the "investable" dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct InvestQuote {
    /// Bond title
    pub name: String,
    /// Annual investment rate text
    pub annual_investment_rate: Rate,
    /// Unit purchase price
    pub unitary_investment_value: Decimal,
    /// Minimum purchase amount
    pub minimum_investment_amount: Decimal,
    /// Maturity date text
    pub maturity: Option<String>,
}

/// One row of the "redeemable" dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RedeemQuote {
    /// Bond title
    pub name: String,
    /// Annual redemption rate text
    pub annual_redemption_rate: Rate,
    /// Unit sell-back price
    pub unitary_redemption_value: Decimal,
    /// Maturity date text
    pub maturity: Option<String>,
}

// =============================================================================
// KEYS
// =============================================================================

/// Snapshot key for a bond name: the name, lowercased.
pub fn bond_key(name: &str) -> String {
    name.to_lowercase()
}

/// Snapshot key for a lookup coming from a URL.
///
/// `_` and `-` stand for spaces so that `tesouro_selic_2029` and
/// `Tesouro-Selic-2029` both find "Tesouro Selic 2029".
pub fn lookup_key(name: &str) -> String {
    name.replace(['_', '-'], " ").to_lowercase()
}
