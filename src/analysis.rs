// =============================================================================
// Per-symbol analysis — bars + fundamentals in, one immutable snapshot out
// =============================================================================
//
// `TickerAnalysis` is the unit the AI stages reason over.  It is created once
// per symbol per run and never mutated; a symbol that cannot produce one
// (fetch failure, thin history) yields `None` and is dropped from the run
// without aborting it.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fundamentals::{Fundamentals, FundamentalsClient};
use crate::indicators::{round2, IndicatorEngine, Indicators};
use crate::market_data::{Bar, BarProvider};
use crate::patterns::{Pattern, PatternDetector};
use crate::runtime_config::RuntimeConfig;

/// Everything the AI stages know about one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerAnalysis {
    pub symbol: String,
    pub last_price: f64,
    /// Close-over-close change across the trailing session window, percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_change_pct: Option<f64>,
    pub bar_count: usize,
    pub patterns: Vec<Pattern>,
    pub indicators: Indicators,
    pub fundamentals: Fundamentals,
}

/// Assemble a `TickerAnalysis` from already-fetched inputs.
///
/// Returns `None` when the series is shorter than `min_bars` — the symbol is
/// dropped, not failed.
pub fn build_analysis(
    symbol: &str,
    bars: &[Bar],
    fundamentals: Fundamentals,
    min_bars: usize,
    session_bars: usize,
) -> Option<TickerAnalysis> {
    if bars.len() < min_bars {
        warn!(
            symbol,
            got = bars.len(),
            need = min_bars,
            "insufficient bars; dropping symbol from this run"
        );
        return None;
    }

    let indicators = IndicatorEngine::compute(bars, session_bars)?;
    let patterns = PatternDetector::detect(bars);
    let last_price = indicators.price;

    Some(TickerAnalysis {
        symbol: symbol.to_string(),
        last_price,
        day_change_pct: day_change_pct(bars, session_bars),
        bar_count: bars.len(),
        patterns,
        indicators,
        fundamentals,
    })
}

/// Fetch bars and fundamentals for one symbol and build its analysis.
///
/// Any upstream failure degrades to `None`; the batch and the run carry on.
pub async fn analyze_symbol(
    symbol: &str,
    bars: &BarProvider,
    fundamentals: &FundamentalsClient,
    config: &RuntimeConfig,
) -> Option<TickerAnalysis> {
    let series = match bars
        .get_bars(symbol, &config.bar_granularity, config.bar_limit)
        .await
    {
        Ok(series) => series,
        Err(e) => {
            warn!(symbol, error = %e, "bar fetch failed; dropping symbol from this run");
            return None;
        }
    };

    let fundamentals = fundamentals.aggregate(symbol).await;

    let analysis = build_analysis(
        symbol,
        &series,
        fundamentals,
        config.min_bars,
        config.session_bars,
    );
    if analysis.is_some() {
        debug!(symbol, bars = series.len(), "symbol analysed");
    }
    analysis
}

/// Percent change between the latest close and the close one session-window
/// ago.  Absent when the series does not reach back a full window.
fn day_change_pct(bars: &[Bar], session_bars: usize) -> Option<f64> {
    if bars.len() <= session_bars {
        return None;
    }
    let last = bars[bars.len() - 1].close;
    let then = bars[bars.len() - 1 - session_bars].close;
    if then == 0.0 {
        return None;
    }
    let pct = (last - then) / then * 100.0;
    pct.is_finite().then(|| round2(pct))
}
