// =============================================================================
// Average True Range (ATR) — plain mean over the trailing window
// =============================================================================
//
// True Range for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR(14) is the arithmetic mean of the last 14 TR values; ATR% rescales it
// by the latest close so volatility compares across price levels.
// =============================================================================

use crate::market_data::Bar;

/// Mean true range over the last `period` bars.
///
/// Returns `None` when `period` is zero, there are fewer than `period + 1`
/// bars (each TR needs the previous close), or any value is non-finite.
pub fn calculate_atr(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    let tail = &bars[bars.len() - (period + 1)..];
    let mut sum = 0.0;
    for pair in tail.windows(2) {
        let prev_close = pair[0].close;
        let bar = &pair[1];

        let hl = bar.high - bar.low;
        let hc = (bar.high - prev_close).abs();
        let lc = (bar.low - prev_close).abs();
        sum += hl.max(hc).max(lc);
    }

    let atr = sum / period as f64;
    atr.is_finite().then_some(atr)
}

/// ATR as a percentage of the latest close.
pub fn calculate_atr_pct(bars: &[Bar], period: usize) -> Option<f64> {
    let atr = calculate_atr(bars, period)?;
    let last_close = bars.last()?.close;
    if last_close == 0.0 {
        return None;
    }
    let pct = atr / last_close * 100.0;
    pct.is_finite().then_some(pct)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 300, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1000.0,
            vwap: None,
        }
    }

    #[test]
    fn atr_insufficient_data() {
        let bars: Vec<Bar> = (0..14).map(|i| bar(i, 100.0, 105.0, 95.0, 102.0)).collect();
        assert!(calculate_atr(&bars, 14).is_none());
        assert!(calculate_atr(&bars, 0).is_none());
    }

    #[test]
    fn atr_constant_range() {
        // Every bar spans exactly 10 with closes at the midpoint, so each TR
        // is the bar range and the mean is 10.
        let bars: Vec<Bar> = (0..20)
            .map(|i| {
                let base = 100.0;
                bar(i, base, base + 5.0, base - 5.0, base)
            })
            .collect();
        let atr = calculate_atr(&bars, 14).unwrap();
        assert!((atr - 10.0).abs() < 1e-10, "got {atr}");
    }

    #[test]
    fn atr_gap_uses_previous_close() {
        // A gap-up bar whose |high - prevClose| dwarfs its own range.
        let bars = vec![
            bar(0, 100.0, 105.0, 95.0, 95.0),
            bar(1, 110.0, 115.0, 108.0, 112.0), // |115 - 95| = 20 > 7
            bar(2, 112.0, 118.0, 110.0, 115.0),
            bar(3, 115.0, 120.0, 113.0, 118.0),
        ];
        let atr = calculate_atr(&bars, 3).unwrap();
        assert!(atr > 7.0, "ATR should reflect the gap, got {atr}");
    }

    #[test]
    fn atr_only_last_window_counts() {
        // Huge old ranges followed by a calm tail: mean must come from the
        // tail only.
        let mut bars: Vec<Bar> = (0..10).map(|i| bar(i, 100.0, 200.0, 50.0, 100.0)).collect();
        bars.extend((10..26).map(|i| bar(i, 100.0, 101.0, 99.0, 100.0)));
        let atr = calculate_atr(&bars, 14).unwrap();
        assert!((atr - 2.0).abs() < 1e-10, "got {atr}");
    }

    #[test]
    fn atr_pct_scales_by_price() {
        let bars: Vec<Bar> = (0..20).map(|i| bar(i, 100.0, 102.0, 98.0, 100.0)).collect();
        let pct = calculate_atr_pct(&bars, 14).unwrap();
        assert!((pct - 4.0).abs() < 1e-10, "got {pct}");
    }
}
