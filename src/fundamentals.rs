// =============================================================================
// Fundamentals aggregation — two providers, one typed merge
// =============================================================================
//
// The reference-data provider supplies identity fields (name, sector, market
// cap); the ratios provider supplies richer valuation and balance-sheet
// figures.  `merge` states precedence field by field — the ratios source wins
// on overlap — so a shape drift in either provider can never silently drop a
// field.
//
// Partial data is the normal case: every field is optional, and a provider
// failure degrades to an empty record instead of failing the pipeline.
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Sparse fundamentals record.  Absent field != error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_to_book: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_margin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_on_equity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_to_equity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_cash_flow: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,
}

impl Fundamentals {
    /// True when no provider supplied anything at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Merge two sparse records with per-field precedence: the `secondary`
/// (ratios) source wins wherever both supply a value, because its valuation
/// figures are the better-curated ones.
pub fn merge_fundamentals(primary: Fundamentals, secondary: Fundamentals) -> Fundamentals {
    Fundamentals {
        name: secondary.name.or(primary.name),
        sector: secondary.sector.or(primary.sector),
        market_cap: secondary.market_cap.or(primary.market_cap),
        pe_ratio: secondary.pe_ratio.or(primary.pe_ratio),
        price_to_book: secondary.price_to_book.or(primary.price_to_book),
        profit_margin: secondary.profit_margin.or(primary.profit_margin),
        return_on_equity: secondary.return_on_equity.or(primary.return_on_equity),
        debt_to_equity: secondary.debt_to_equity.or(primary.debt_to_equity),
        free_cash_flow: secondary.free_cash_flow.or(primary.free_cash_flow),
        dividend_yield: secondary.dividend_yield.or(primary.dividend_yield),
    }
}

/// HTTP client for both fundamentals providers.
#[derive(Clone)]
pub struct FundamentalsClient {
    reference_url: String,
    ratios_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl FundamentalsClient {
    pub fn new(
        reference_url: impl Into<String>,
        ratios_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            reference_url: reference_url.into(),
            ratios_url: ratios_url.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Fetch and merge both sources.  Either source failing (or both) is a
    /// degradation, not an error: the caller always gets a record back.
    #[instrument(skip(self), name = "fundamentals::aggregate")]
    pub async fn aggregate(&self, symbol: &str) -> Fundamentals {
        let reference = match self.fetch_reference(symbol).await {
            Ok(data) => data,
            Err(e) => {
                warn!(symbol, error = %e, "reference-data source failed; continuing without it");
                Fundamentals::default()
            }
        };

        let ratios = match self.fetch_ratios(symbol).await {
            Ok(data) => data,
            Err(e) => {
                warn!(symbol, error = %e, "ratios source failed; continuing without it");
                Fundamentals::default()
            }
        };

        let merged = merge_fundamentals(reference, ratios);
        debug!(symbol, empty = merged.is_empty(), "fundamentals aggregated");
        merged
    }

    /// GET the reference-data provider's company overview.
    async fn fetch_reference(&self, symbol: &str) -> Result<Fundamentals> {
        let url = format!(
            "{}/overview?symbol={}&apikey={}",
            self.reference_url, symbol, self.api_key
        );
        let body = self.get_json(&url).await?;

        Ok(Fundamentals {
            name: opt_string(&body["Name"]),
            sector: opt_string(&body["Sector"]),
            market_cap: opt_f64(&body["MarketCapitalization"]),
            pe_ratio: opt_f64(&body["PERatio"]),
            dividend_yield: opt_f64(&body["DividendYield"]),
            ..Fundamentals::default()
        })
    }

    /// GET the ratios provider's valuation record.
    async fn fetch_ratios(&self, symbol: &str) -> Result<Fundamentals> {
        let url = format!(
            "{}/ratios/{}?apikey={}",
            self.ratios_url, symbol, self.api_key
        );
        let body = self.get_json(&url).await?;

        // The ratios provider wraps the record in a one-element array.
        let record = body.as_array().and_then(|a| a.first()).unwrap_or(&body);

        Ok(Fundamentals {
            market_cap: opt_f64(&record["marketCap"]),
            pe_ratio: opt_f64(&record["peRatio"]),
            price_to_book: opt_f64(&record["priceToBook"]),
            profit_margin: opt_f64(&record["netProfitMargin"]),
            return_on_equity: opt_f64(&record["returnOnEquity"]),
            debt_to_equity: opt_f64(&record["debtToEquity"]),
            free_cash_flow: opt_f64(&record["freeCashFlow"]),
            dividend_yield: opt_f64(&record["dividendYield"]),
            ..Fundamentals::default()
        })
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("fundamentals request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("fundamentals provider returned {status}");
        }

        resp.json()
            .await
            .context("failed to parse fundamentals response")
    }
}

impl std::fmt::Debug for FundamentalsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FundamentalsClient")
            .field("reference_url", &self.reference_url)
            .field("ratios_url", &self.ratios_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// JSON field helpers
// =============================================================================

/// Read a value that may be a number or a numeric string.  Provider records
/// use literals like "None" or "-" for missing figures; those read as absent.
fn opt_f64(val: &serde_json::Value) -> Option<f64> {
    if let Some(n) = val.as_f64() {
        return n.is_finite().then_some(n);
    }
    val.as_str()?.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Read an optional non-empty string.
fn opt_string(val: &serde_json::Value) -> Option<String> {
    let s = val.as_str()?.trim();
    if s.is_empty() || s == "None" || s == "-" {
        return None;
    }
    Some(s.to_string())
}
