// =============================================================================
// Runtime Configuration — hot-loadable engine settings with atomic save
// =============================================================================
//
// Every tunable parameter lives here.  All fields carry `#[serde(default)]`
// so that adding new fields never breaks loading an older config file, and
// persistence uses a tmp + rename pattern to prevent corruption on crash.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_watchlist() -> Vec<String> {
    vec![
        "AAPL".to_string(),
        "MSFT".to_string(),
        "NVDA".to_string(),
        "AMZN".to_string(),
        "GOOGL".to_string(),
        "META".to_string(),
        "TSLA".to_string(),
    ]
}

fn default_batch_size() -> usize {
    3
}

fn default_batch_delay_ms() -> u64 {
    1500
}

fn default_bar_granularity() -> String {
    "5Min".to_string()
}

fn default_bar_limit() -> u32 {
    300
}

fn default_min_bars() -> usize {
    20
}

fn default_session_bars() -> usize {
    // One 6.5 h equity session of 5-minute bars.
    78
}

fn default_account_equity() -> f64 {
    100_000.0
}

fn default_min_confidence() -> f64 {
    0.6
}

fn default_run_timeout_secs() -> u64 {
    55
}

fn default_screening_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_authorization_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the Meridian engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Watchlist -----------------------------------------------------------

    /// Symbols analysed when a request names none.
    #[serde(default = "default_watchlist")]
    pub watchlist: Vec<String>,

    // --- Batching (rate-limit accommodation) ---------------------------------

    /// Symbols analysed concurrently per batch window.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batch windows, milliseconds.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    // --- Market data ---------------------------------------------------------

    /// Bar granularity requested from the provider.
    #[serde(default = "default_bar_granularity")]
    pub bar_granularity: String,

    /// Bars requested per symbol.
    #[serde(default = "default_bar_limit")]
    pub bar_limit: u32,

    /// Minimum bars before a symbol is analysable.
    #[serde(default = "default_min_bars")]
    pub min_bars: usize,

    /// Bars per trading session at the configured granularity; drives the
    /// VWAP window and the day-change comparison.
    #[serde(default = "default_session_bars")]
    pub session_bars: usize,

    // --- Decision thresholds -------------------------------------------------

    /// Notional account equity the planner sizes against.
    #[serde(default = "default_account_equity")]
    pub account_equity: f64,

    /// Confidence floor for actionable recommendations and execution.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Wall-clock budget for a full pipeline run, seconds.
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    // --- Models --------------------------------------------------------------

    /// Fast/cheap model used by the screening stage.
    #[serde(default = "default_screening_model")]
    pub screening_model: String,

    /// Stronger/slower model used by the authorization stage.
    #[serde(default = "default_authorization_model")]
    pub authorization_model: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            watchlist: default_watchlist(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            bar_granularity: default_bar_granularity(),
            bar_limit: default_bar_limit(),
            min_bars: default_min_bars(),
            session_bars: default_session_bars(),
            account_equity: default_account_equity(),
            min_confidence: default_min_confidence(),
            run_timeout_secs: default_run_timeout_secs(),
            screening_model: default_screening_model(),
            authorization_model: default_authorization_model(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            watchlist = ?config.watchlist,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.watchlist.len(), 7);
        assert_eq!(cfg.watchlist[0], "AAPL");
        assert_eq!(cfg.batch_size, 3);
        assert_eq!(cfg.batch_delay_ms, 1500);
        assert_eq!(cfg.min_bars, 20);
        assert_eq!(cfg.session_bars, 78);
        assert!((cfg.account_equity - 100_000.0).abs() < f64::EPSILON);
        assert!((cfg.min_confidence - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.batch_size, 3);
        assert_eq!(cfg.session_bars, 78);
        assert_eq!(cfg.screening_model, "llama-3.1-8b-instant");
        assert_eq!(cfg.authorization_model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "watchlist": ["SPY"], "session_bars": 26 }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.watchlist, vec!["SPY"]);
        assert_eq!(cfg.session_bars, 26);
        assert_eq!(cfg.batch_size, 3);
        assert_eq!(cfg.run_timeout_secs, 55);
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = RuntimeConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.watchlist, cfg2.watchlist);
        assert_eq!(cfg.batch_delay_ms, cfg2.batch_delay_ms);
        assert_eq!(cfg.screening_model, cfg2.screening_model);
    }
}
