pub mod provider;

// Re-export the Bar struct for convenient access (e.g. `use crate::market_data::Bar`).
pub use provider::BarProvider;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV sample over a fixed interval.  Series are ascending in time with
/// no duplicate timestamps, and immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time.
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
    /// Provider-computed volume-weighted price for the bar, when supplied.
    #[serde(rename = "vw", default, skip_serializing_if = "Option::is_none")]
    pub vwap: Option<f64>,
}

impl Bar {
    /// Full bar range (high − low).
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Absolute body size (|close − open|).
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// True when the bar closed above its open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Typical price used by the VWAP calculation.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}
