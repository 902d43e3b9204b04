// =============================================================================
// Bollinger Bands (20, 2)
// =============================================================================
//
// Middle band = SMA(20), outer bands = middle ± 2 population-stddev.  Width is
// the normalised band distance (upper - lower) / middle.  The last close is
// bucketed by its z-score: |z| >= 2 sits outside a band, |z| >= 1 is near it,
// anything closer is middle.
// =============================================================================

use crate::types::BandPosition;

/// Latest Bollinger Band snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerResult {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub width: f64,
    pub position: BandPosition,
}

/// Calculate Bollinger Bands over the last `period` closes.
///
/// Returns `None` when there are fewer than `period` closes, the period is
/// zero, or the middle band is zero (degenerate input).
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> Option<BollingerResult> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let window = &closes[closes.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    if middle == 0.0 || !middle.is_finite() {
        return None;
    }

    let variance = window.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / period as f64;
    let std_dev = variance.sqrt();

    let upper = middle + num_std * std_dev;
    let lower = middle - num_std * std_dev;
    let width = (upper - lower) / middle;
    if !width.is_finite() {
        return None;
    }

    let last = window[period - 1];
    let position = if std_dev <= f64::EPSILON {
        BandPosition::Middle
    } else {
        let z = (last - middle) / std_dev;
        if z >= num_std {
            BandPosition::AboveUpper
        } else if z >= 1.0 {
            BandPosition::NearUpper
        } else if z <= -num_std {
            BandPosition::BelowLower
        } else if z <= -1.0 {
            BandPosition::NearLower
        } else {
            BandPosition::Middle
        }
    };

    Some(BollingerResult {
        upper,
        middle,
        lower,
        width,
        position,
    })
}
