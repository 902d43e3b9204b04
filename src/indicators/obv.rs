// =============================================================================
// On-Balance Volume — cumulative signed volume and its recent drift
// =============================================================================
//
// OBV adds the bar's volume on an up-close and subtracts it on a down-close
// (unchanged closes leave it flat).  The trend compares the mean of the last
// 10 OBV values against the mean of the 10 before them: more than 5 % higher
// reads as accumulation, more than 5 % lower as distribution.
// =============================================================================

use crate::market_data::Bar;
use crate::types::ObvTrend;

/// Window width for each side of the drift comparison.
const DRIFT_WINDOW: usize = 10;
/// Relative change that counts as a drift.
const DRIFT_THRESHOLD: f64 = 0.05;

/// Running OBV series, one value per bar (the first bar starts at zero).
pub fn obv_series(bars: &[Bar]) -> Vec<f64> {
    let mut series = Vec::with_capacity(bars.len());
    let mut obv = 0.0;
    let mut prev_close = None;

    for bar in bars {
        if let Some(prev) = prev_close {
            if bar.close > prev {
                obv += bar.volume;
            } else if bar.close < prev {
                obv -= bar.volume;
            }
        }
        series.push(obv);
        prev_close = Some(bar.close);
    }

    series
}

/// Classify the OBV drift over the last `2 * DRIFT_WINDOW` bars.
///
/// Returns `Neutral` when there is not enough history for both windows.
pub fn obv_trend(bars: &[Bar]) -> ObvTrend {
    let series = obv_series(bars);
    if series.len() < DRIFT_WINDOW * 2 {
        return ObvTrend::Neutral;
    }

    let recent = &series[series.len() - DRIFT_WINDOW..];
    let prior = &series[series.len() - DRIFT_WINDOW * 2..series.len() - DRIFT_WINDOW];

    let recent_mean = recent.iter().sum::<f64>() / DRIFT_WINDOW as f64;
    let prior_mean = prior.iter().sum::<f64>() / DRIFT_WINDOW as f64;

    // Normalise by the prior magnitude; the floor keeps a flat prior window
    // from swallowing a genuine move.
    let change = (recent_mean - prior_mean) / prior_mean.abs().max(1e-9);

    if change > DRIFT_THRESHOLD {
        ObvTrend::Accumulation
    } else if change < -DRIFT_THRESHOLD {
        ObvTrend::Distribution
    } else {
        ObvTrend::Neutral
    }
}
