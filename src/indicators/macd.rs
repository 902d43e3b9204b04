// =============================================================================
// MACD (12, 26, 9) — trend-momentum with signal-line cross
// =============================================================================
//
// The 12- and 26-period EMA series start at different close indices, so they
// are aligned by the fixed offset 26 - 12 = 14 before subtracting:
//
//   line[i]   = ema12[i + 14] - ema26[i]
//   signal    = EMA(9) of the line series
//   histogram = line - signal  (at the latest aligned point)
//
// The cross state compares line vs signal on the last two evaluation points,
// exactly like the EMA 9/21 cross.
// =============================================================================

use crate::indicators::ema::{calculate_ema, detect_cross};
use crate::types::CrossState;

const FAST: usize = 12;
const SLOW: usize = 26;
const SIGNAL: usize = 9;

/// Latest MACD snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdResult {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
    pub cross: CrossState,
}

/// Compute MACD(12, 26, 9) over `closes`.
///
/// Returns `None` until the signal line has at least one value, which needs
/// `SLOW + SIGNAL - 1` = 34 closes.  The cross state stays `Neutral` until
/// one more close gives the signal line a second evaluation point.
pub fn calculate_macd(closes: &[f64]) -> Option<MacdResult> {
    let ema_fast = calculate_ema(closes, FAST);
    let ema_slow = calculate_ema(closes, SLOW);
    if ema_slow.is_empty() {
        return None;
    }

    let offset = SLOW - FAST;
    let line: Vec<f64> = ema_slow
        .iter()
        .enumerate()
        .map(|(i, &slow)| ema_fast[i + offset] - slow)
        .collect();

    let signal_series = calculate_ema(&line, SIGNAL);
    let signal = *signal_series.last()?;
    let latest = *line.last()?;
    let histogram = latest - signal;

    if !histogram.is_finite() {
        return None;
    }

    Some(MacdResult {
        line: latest,
        signal,
        histogram,
        cross: detect_cross(&line, &signal_series),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_absent_below_34_closes() {
        let closes: Vec<f64> = (1..=33).map(|x| x as f64).collect();
        assert!(calculate_macd(&closes).is_none());
    }

    #[test]
    fn macd_present_at_34_closes() {
        let closes: Vec<f64> = (1..=34).map(|x| x as f64).collect();
        let macd = calculate_macd(&closes).unwrap();
        assert!(macd.line.is_finite());
        assert!(macd.signal.is_finite());
        // Exactly one signal value => no cross history yet.
        assert_eq!(macd.cross, CrossState::Neutral);
    }

    #[test]
    fn macd_positive_in_steady_uptrend() {
        let closes: Vec<f64> = (1..=60).map(|x| x as f64).collect();
        let macd = calculate_macd(&closes).unwrap();
        // Fast EMA rides above slow EMA when price keeps rising.
        assert!(macd.line > 0.0, "line {}", macd.line);
        assert!(macd.histogram.is_finite());
    }

    #[test]
    fn macd_negative_in_steady_downtrend() {
        let closes: Vec<f64> = (1..=60).rev().map(|x| x as f64).collect();
        let macd = calculate_macd(&closes).unwrap();
        assert!(macd.line < 0.0, "line {}", macd.line);
    }

    #[test]
    fn macd_flat_series_is_zero() {
        let closes = vec![50.0; 60];
        let macd = calculate_macd(&closes).unwrap();
        assert!(macd.line.abs() < 1e-10);
        assert!(macd.signal.abs() < 1e-10);
        assert!(macd.histogram.abs() < 1e-10);
        assert_eq!(macd.cross, CrossState::Neutral);
    }

    #[test]
    fn macd_alignment_offset_is_consistent() {
        // line[i] must pair ema12 and ema26 values computed through the same
        // final close; spot-check by recomputing the last point by hand.
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let ema12 = calculate_ema(&closes, 12);
        let ema26 = calculate_ema(&closes, 26);
        let macd = calculate_macd(&closes).unwrap();
        let expected = ema12.last().unwrap() - ema26.last().unwrap();
        assert!((macd.line - expected).abs() < 1e-10);
    }
}
