// =============================================================================
// Market-bar provider — REST client for intraday OHLCV series
// =============================================================================
//
// SECURITY: the API key is sent as a header and never appears in the URL, the
// logs, or the Debug output.  Responses are status-checked before the body is
// parsed so a provider error page never reaches the bar decoder.
// =============================================================================

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::market_data::Bar;

/// REST client for the market-bar provider.
#[derive(Clone)]
pub struct BarProvider {
    base_url: String,
    client: reqwest::Client,
}

/// Wire shape of the provider's bar-series response.
#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: Vec<Bar>,
}

impl BarProvider {
    /// Create a new provider client.
    ///
    /// # Arguments
    /// * `base_url` — provider root, e.g. `https://data.example.com`.
    /// * `api_key`  — sent as the `APCA-API-KEY-ID` header on every request.
    pub fn new(base_url: impl Into<String>, api_key: &str) -> Self {
        let mut default_headers = HeaderMap::new();
        if let Ok(val) = HeaderValue::from_str(api_key) {
            default_headers.insert("APCA-API-KEY-ID", val);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// GET `/v2/stocks/{symbol}/bars` — fetch up to `limit` bars at the given
    /// granularity (e.g. `"5Min"`), oldest first.
    ///
    /// Bars that fail basic sanity checks (non-positive range, non-finite
    /// fields) are skipped with a warning rather than failing the request.
    #[instrument(skip(self), name = "bars::get_bars")]
    pub async fn get_bars(&self, symbol: &str, granularity: &str, limit: u32) -> Result<Vec<Bar>> {
        let url = format!(
            "{}/v2/stocks/{}/bars?timeframe={}&limit={}",
            self.base_url, symbol, granularity, limit
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("bar-series request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("bar provider returned {status} for {symbol}: {body}");
        }

        let parsed: BarsResponse = resp
            .json()
            .await
            .context("failed to parse bar-series response")?;

        let mut bars: Vec<Bar> = Vec::with_capacity(parsed.bars.len());
        for bar in parsed.bars {
            let finite = bar.open.is_finite()
                && bar.high.is_finite()
                && bar.low.is_finite()
                && bar.close.is_finite()
                && bar.volume.is_finite();
            if !finite || bar.high < bar.low {
                warn!(symbol, ts = %bar.timestamp, "skipping malformed bar");
                continue;
            }
            bars.push(bar);
        }

        // The indicator suite assumes ascending time; enforce it here once so
        // every downstream consumer can rely on it.
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);

        debug!(symbol, granularity, count = bars.len(), "bars fetched");
        Ok(bars)
    }
}

impl std::fmt::Debug for BarProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
