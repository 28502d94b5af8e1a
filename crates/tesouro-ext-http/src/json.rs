//! JSON document source.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use tesouro_traits::{BondRecord, BondSource, ParsedBonds, Rate, RawDatasets, SourceError, SourceKind};

use crate::client::BrowserClient;

// =============================================================================
// WIRE FORMAT
// =============================================================================

#[derive(Debug, Deserialize)]
struct TreasuryDocument {
    response: TreasuryData,
}

#[derive(Debug, Deserialize)]
struct TreasuryData {
    #[serde(rename = "TrsrBdTradgList")]
    trading_list: Vec<TradingEntry>,
    #[serde(rename = "BizSts")]
    business_status: BusinessStatus,
}

#[derive(Debug, Deserialize)]
struct TradingEntry {
    #[serde(rename = "TrsrBd")]
    bond: TreasuryBond,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreasuryBond {
    nm: String,
    #[serde(default)]
    anul_invstmt_rate: Decimal,
    #[serde(default)]
    untr_invstmt_val: Decimal,
    #[serde(default)]
    min_invstmt_amt: Decimal,
    #[serde(default)]
    anul_red_rate: Decimal,
    #[serde(default)]
    untr_red_val: Decimal,
    #[serde(default)]
    min_red_val: Decimal,
    #[serde(default)]
    mtrty_dt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BusinessStatus {
    dt_tm: String,
}

impl TreasuryBond {
    fn into_record(self) -> Result<BondRecord, SourceError> {
        for (field, amount) in [
            ("untrInvstmtVal", self.untr_invstmt_val),
            ("minInvstmtAmt", self.min_invstmt_amt),
            ("untrRedVal", self.untr_red_val),
            ("minRedVal", self.min_red_val),
        ] {
            if amount.is_sign_negative() && !amount.is_zero() {
                return Err(SourceError::InvalidAmount(format!(
                    "{field} = {amount} for {}",
                    self.nm
                )));
            }
        }

        Ok(BondRecord {
            investable: self.untr_invstmt_val > Decimal::ZERO,
            name: self.nm,
            annual_investment_rate: Some(Rate::Numeric(self.anul_invstmt_rate)),
            annual_redemption_rate: Some(Rate::Numeric(self.anul_red_rate)),
            unitary_investment_value: Some(self.untr_invstmt_val),
            unitary_redemption_value: Some(self.untr_red_val),
            minimum_investment_amount: Some(self.min_invstmt_amt),
            minimum_redemption_value: Some(self.min_red_val),
            maturity: self.mtrty_dt,
        })
    }
}

/// Decode the upstream JSON document into unified bond records.
pub fn parse_json_document(body: &[u8]) -> Result<ParsedBonds, SourceError> {
    let document: TreasuryDocument =
        serde_json::from_slice(body).map_err(|e| SourceError::ParseError(e.to_string()))?;

    let bonds = document
        .response
        .trading_list
        .into_iter()
        .map(|entry| entry.bond.into_record())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedBonds::Unified {
        bonds,
        business_time: document.response.business_status.dt_tm,
    })
}

// =============================================================================
// SOURCE
// =============================================================================

/// Source reading the single JSON document.
pub struct JsonBondSource {
    client: BrowserClient,
    url: String,
}

impl JsonBondSource {
    /// Create a source for the document at `url`.
    pub fn new(client: BrowserClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl BondSource for JsonBondSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Json
    }

    async fn fetch(&self) -> Result<RawDatasets, SourceError> {
        let body = self.client.get_bytes(&self.url).await?;
        Ok(RawDatasets::Json(body))
    }

    fn parse(&self, raw: RawDatasets) -> Result<ParsedBonds, SourceError> {
        match raw {
            RawDatasets::Json(body) => parse_json_document(&body),
            RawDatasets::Delimited { .. } => Err(SourceError::UnexpectedDataset(
                "JSON source received delimited datasets".into(),
            )),
        }
    }
}
