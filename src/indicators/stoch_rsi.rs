// =============================================================================
// Stochastic RSI (14, 3, 3)
// =============================================================================
//
// Each RSI value is stochastic-normalised against the min/max of its own
// trailing 14-value window:
//
//   %K = (RSI - min) / (max - min) * 100
//   %D = 3-point mean of %K
//
// Overbought/oversold is only called when BOTH %K and %D clear 80 / 20 —
// a single spiking line is not enough.
// =============================================================================

use crate::indicators::rsi::calculate_rsi_series;
use crate::types::StochSignal;

const OVERBOUGHT: f64 = 80.0;
const OVERSOLD: f64 = 20.0;

/// Latest Stochastic-RSI snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StochRsiResult {
    pub k: f64,
    pub d: f64,
    pub signal: StochSignal,
}

/// Compute Stochastic RSI over `closes`.
///
/// # Arguments
/// * `rsi_period`   — look-back for the underlying RSI series (14).
/// * `stoch_period` — normalisation window over the RSI series (14).
/// * `smooth`       — %D smoothing width over %K (3).
///
/// Returns `None` when any stage lacks history: the RSI series needs
/// `rsi_period + 1` closes per value, and %D needs `stoch_period + smooth - 1`
/// RSI values — 30 closes in the default configuration.
pub fn calculate_stoch_rsi(
    closes: &[f64],
    rsi_period: usize,
    stoch_period: usize,
    smooth: usize,
) -> Option<StochRsiResult> {
    if stoch_period == 0 || smooth == 0 {
        return None;
    }

    let rsi = calculate_rsi_series(closes, rsi_period);
    if rsi.len() < stoch_period + smooth - 1 {
        return None;
    }

    // %K for every RSI window; we only need the last `smooth` of them.
    let k_series: Vec<f64> = rsi
        .windows(stoch_period)
        .map(|w| {
            let min = w.iter().copied().fold(f64::INFINITY, f64::min);
            let max = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let span = max - min;
            if span <= f64::EPSILON {
                // Flat RSI window: no meaningful position inside the range.
                50.0
            } else {
                (w[stoch_period - 1] - min) / span * 100.0
            }
        })
        .collect();

    let k = *k_series.last()?;
    let d_window = &k_series[k_series.len() - smooth..];
    let d = d_window.iter().sum::<f64>() / smooth as f64;

    if !k.is_finite() || !d.is_finite() {
        return None;
    }

    let signal = if k > OVERBOUGHT && d > OVERBOUGHT {
        StochSignal::Overbought
    } else if k < OVERSOLD && d < OVERSOLD {
        StochSignal::Oversold
    } else {
        StochSignal::Neutral
    };

    Some(StochRsiResult { k, d, signal })
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stoch_rsi_absent_below_30_closes() {
        let closes: Vec<f64> = (1..=29).map(|x| x as f64).collect();
        assert!(calculate_stoch_rsi(&closes, 14, 14, 3).is_none());
    }

    #[test]
    fn stoch_rsi_present_at_30_closes() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64).sin() * 4.0).collect();
        assert!(calculate_stoch_rsi(&closes, 14, 14, 3).is_some());
    }

    #[test]
    fn stoch_rsi_bounds() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.9).sin() * 7.0 + (i as f64 * 0.13).cos() * 3.0)
            .collect();
        let s = calculate_stoch_rsi(&closes, 14, 14, 3).unwrap();
        assert!((0.0..=100.0).contains(&s.k), "%K {} out of range", s.k);
        assert!((0.0..=100.0).contains(&s.d), "%D {} out of range", s.d);
    }

    #[test]
    fn stoch_rsi_flat_window_is_neutral_midpoint() {
        // Constant closes => constant RSI => degenerate window => 50/50.
        let closes = vec![100.0; 40];
        let s = calculate_stoch_rsi(&closes, 14, 14, 3).unwrap();
        assert!((s.k - 50.0).abs() < 1e-10);
        assert!((s.d - 50.0).abs() < 1e-10);
        assert_eq!(s.signal, StochSignal::Neutral);
    }

    #[test]
    fn stoch_rsi_overbought_after_momentum_burst() {
        // Chop for 30 bars, then accelerate: RSI climbs to the top of its own
        // recent range, pushing both %K and %D above 80.
        let mut closes: Vec<f64> = (0..30)
            .map(|i| 100.0 + if i % 2 == 0 { -0.5 } else { 0.5 })
            .collect();
        closes.extend((0..12).map(|i| 101.0 + i as f64 * 2.0));
        let s = calculate_stoch_rsi(&closes, 14, 14, 3).unwrap();
        assert_eq!(s.signal, StochSignal::Overbought, "k={} d={}", s.k, s.d);
    }

    #[test]
    fn stoch_rsi_oversold_after_selloff() {
        let mut closes: Vec<f64> = (0..30)
            .map(|i| 100.0 + if i % 2 == 0 { -0.5 } else { 0.5 })
            .collect();
        closes.extend((0..12).map(|i| 99.0 - i as f64 * 2.0));
        let s = calculate_stoch_rsi(&closes, 14, 14, 3).unwrap();
        assert_eq!(s.signal, StochSignal::Oversold, "k={} d={}", s.k, s.d);
    }
}
