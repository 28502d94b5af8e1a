//! Delimited (`;`) dataset source.
//!
//! Upstream publishes two documents: bonds open for investment and bonds
//! open for redemption. Both carry a header row with Portuguese column
//! names and pt-BR formatted amounts.

use async_trait::async_trait;
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use tesouro_traits::{
    BondSource, InvestQuote, ParsedBonds, Rate, RawDatasets, RedeemQuote, SourceError, SourceKind,
};

use crate::client::BrowserClient;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// =============================================================================
// ROWS
// =============================================================================

#[derive(Debug, Deserialize)]
struct InvestRow {
    #[serde(rename = "Título")]
    name: String,
    #[serde(rename = "Rendimento anual do título")]
    annual_rate: String,
    #[serde(rename = "Preço unitário de investimento", deserialize_with = "crate::amount::deserialize_brl")]
    unit_price: Decimal,
    #[serde(rename = "Investimento mínimo", deserialize_with = "crate::amount::deserialize_brl")]
    minimum_amount: Decimal,
    #[serde(rename = "Vencimento do Título", default)]
    maturity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RedeemRow {
    #[serde(rename = "Título")]
    name: String,
    #[serde(rename = "Rendimento anual do título")]
    annual_rate: String,
    #[serde(rename = "Preço unitário de resgate", deserialize_with = "crate::amount::deserialize_brl")]
    unit_price: Decimal,
    #[serde(rename = "Vencimento do Título", default)]
    maturity: Option<String>,
}

impl From<InvestRow> for InvestQuote {
    fn from(row: InvestRow) -> Self {
        InvestQuote {
            name: row.name,
            annual_investment_rate: Rate::Text(row.annual_rate),
            unitary_investment_value: row.unit_price,
            minimum_investment_amount: row.minimum_amount,
            maturity: row.maturity.filter(|m| !m.is_empty()),
        }
    }
}

impl From<RedeemRow> for RedeemQuote {
    fn from(row: RedeemRow) -> Self {
        RedeemQuote {
            name: row.name,
            annual_redemption_rate: Rate::Text(row.annual_rate),
            unitary_redemption_value: row.unit_price,
            maturity: row.maturity.filter(|m| !m.is_empty()),
        }
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn read_rows<T: DeserializeOwned>(dataset: &str, body: &[u8]) -> Result<Vec<T>, SourceError> {
    let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);

    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .trim(Trim::All)
        .from_reader(body);

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize().enumerate() {
        let row = result.map_err(|e| {
            SourceError::ParseError(format!("{dataset} dataset, record {}: {e}", i + 1))
        })?;
        rows.push(row);
    }

    debug!(dataset, rows = rows.len(), "Parsed delimited dataset");
    Ok(rows)
}

/// Decode the "investable" dataset.
pub fn parse_invest_csv(body: &[u8]) -> Result<Vec<InvestQuote>, SourceError> {
    let rows: Vec<InvestRow> = read_rows("investable", body)?;
    Ok(rows.into_iter().map(InvestQuote::from).collect())
}

/// Decode the "redeemable" dataset.
pub fn parse_redeem_csv(body: &[u8]) -> Result<Vec<RedeemQuote>, SourceError> {
    let rows: Vec<RedeemRow> = read_rows("redeemable", body)?;
    Ok(rows.into_iter().map(RedeemQuote::from).collect())
}

// =============================================================================
// SOURCE
// =============================================================================

/// Source reading the investable and redeemable datasets.
pub struct CsvBondSource {
    client: BrowserClient,
    invest_url: String,
    redeem_url: String,
}

impl CsvBondSource {
    /// Create a source for the two dataset URLs.
    pub fn new(
        client: BrowserClient,
        invest_url: impl Into<String>,
        redeem_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            invest_url: invest_url.into(),
            redeem_url: redeem_url.into(),
        }
    }
}

#[async_trait]
impl BondSource for CsvBondSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Csv
    }

    async fn fetch(&self) -> Result<RawDatasets, SourceError> {
        let (investable, redeemable) = tokio::try_join!(
            self.client.get_bytes(&self.invest_url),
            self.client.get_bytes(&self.redeem_url),
        )?;
        Ok(RawDatasets::Delimited {
            investable,
            redeemable,
        })
    }

    fn parse(&self, raw: RawDatasets) -> Result<ParsedBonds, SourceError> {
        match raw {
            RawDatasets::Delimited {
                investable,
                redeemable,
            } => Ok(ParsedBonds::Split {
                invest: parse_invest_csv(&investable)?,
                redeem: parse_redeem_csv(&redeemable)?,
            }),
            RawDatasets::Json(_) => Err(SourceError::UnexpectedDataset(
                "delimited source received a JSON document".into(),
            )),
        }
    }
}
