// =============================================================================
// Session VWAP — volume-weighted average price over the trailing session
// =============================================================================
//
//   VWAP = Σ(typical price × volume) / Σ(volume)
//
// computed over the trailing `session_bars` window (one full trading session
// of 5-minute bars by default).  Price-vs-VWAP is bucketed with a ±0.2 % dead
// band so a close sitting on top of VWAP reads as "at", not noise.
// =============================================================================

use crate::market_data::Bar;
use crate::types::VwapPosition;

/// Dead band (fraction of VWAP) inside which price counts as "at" VWAP.
const POSITION_BAND: f64 = 0.002;

/// Latest VWAP snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct VwapResult {
    pub vwap: f64,
    pub position: VwapPosition,
}

/// Compute the trailing-session VWAP.
///
/// Uses the last `session_bars` bars (or all of them when the series is
/// shorter).  Returns `None` on an empty series or zero cumulative volume.
pub fn calculate_vwap(bars: &[Bar], session_bars: usize) -> Option<VwapResult> {
    if bars.is_empty() || session_bars == 0 {
        return None;
    }

    let start = bars.len().saturating_sub(session_bars);
    let window = &bars[start..];

    let mut pv_sum = 0.0;
    let mut vol_sum = 0.0;
    for bar in window {
        pv_sum += bar.typical_price() * bar.volume;
        vol_sum += bar.volume;
    }

    if vol_sum <= 0.0 {
        return None;
    }

    let vwap = pv_sum / vol_sum;
    if !vwap.is_finite() || vwap <= 0.0 {
        return None;
    }

    let price = bars[bars.len() - 1].close;
    let position = if price > vwap * (1.0 + POSITION_BAND) {
        VwapPosition::Above
    } else if price < vwap * (1.0 - POSITION_BAND) {
        VwapPosition::Below
    } else {
        VwapPosition::At
    };

    Some(VwapResult { vwap, position })
}
