// =============================================================================
// Relative volume — last bar against its trailing average
// =============================================================================
//
// Relative volume = last bar volume / mean volume of the 20 bars before it.
// Above 1.5x reads as high participation, below 0.5x as thin tape.
// =============================================================================

use crate::market_data::Bar;
use crate::types::VolumeTrend;

const LOOKBACK: usize = 20;
const HIGH_THRESHOLD: f64 = 1.5;
const LOW_THRESHOLD: f64 = 0.5;

/// Latest relative-volume snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeProfile {
    pub relative_volume: f64,
    pub trend: VolumeTrend,
}

/// Compare the last bar's volume to the mean of the `LOOKBACK` bars before
/// it.  Returns `None` when there are not enough bars or the average is zero.
pub fn relative_volume(bars: &[Bar]) -> Option<VolumeProfile> {
    if bars.len() < LOOKBACK + 1 {
        return None;
    }

    let last = bars[bars.len() - 1].volume;
    let window = &bars[bars.len() - 1 - LOOKBACK..bars.len() - 1];
    let avg = window.iter().map(|b| b.volume).sum::<f64>() / LOOKBACK as f64;

    if avg <= 0.0 || !avg.is_finite() {
        return None;
    }

    let ratio = last / avg;
    if !ratio.is_finite() {
        return None;
    }

    let trend = if ratio > HIGH_THRESHOLD {
        VolumeTrend::High
    } else if ratio < LOW_THRESHOLD {
        VolumeTrend::Low
    } else {
        VolumeTrend::Normal
    };

    Some(VolumeProfile {
        relative_volume: ratio,
        trend,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(i: usize, volume: f64) -> Bar {
        Bar {
            timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 300, 0).unwrap(),
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume,
            vwap: None,
        }
    }

    #[test]
    fn relative_volume_needs_21_bars() {
        let bars: Vec<Bar> = (0..20).map(|i| bar(i, 1000.0)).collect();
        assert!(relative_volume(&bars).is_none());
    }

    #[test]
    fn relative_volume_classification() {
        // 20 bars of 1000, last bar 2000 => ratio 2.0 => high.
        let mut bars: Vec<Bar> = (0..20).map(|i| bar(i, 1000.0)).collect();
        bars.push(bar(20, 2000.0));
        let vp = relative_volume(&bars).unwrap();
        assert!((vp.relative_volume - 2.0).abs() < 1e-10);
        assert_eq!(vp.trend, VolumeTrend::High);

        // Last bar 400 => ratio 0.4 => low.
        let mut bars: Vec<Bar> = (0..20).map(|i| bar(i, 1000.0)).collect();
        bars.push(bar(20, 400.0));
        assert_eq!(relative_volume(&bars).unwrap().trend, VolumeTrend::Low);

        // Last bar 1000 => ratio 1.0 => normal.
        let bars: Vec<Bar> = (0..21).map(|i| bar(i, 1000.0)).collect();
        assert_eq!(relative_volume(&bars).unwrap().trend, VolumeTrend::Normal);
    }

    #[test]
    fn relative_volume_zero_average_is_absent() {
        let mut bars: Vec<Bar> = (0..20).map(|i| bar(i, 0.0)).collect();
        bars.push(bar(20, 500.0));
        assert!(relative_volume(&bars).is_none());
    }
}
