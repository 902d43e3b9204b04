// =============================================================================
// Relative Strength Index (RSI) — simple-average variant
// =============================================================================
//
// Each RSI value looks at the trailing `period` one-bar deltas:
//   avg_gain = mean of positive deltas (zeros counted)
//   avg_loss = mean of |negative deltas| (zeros counted)
//   RSI      = 100 - 100 / (1 + avg_gain / max(avg_loss, ε))
//
// ε = 0.001 floors the loss average so a gain-only window divides cleanly and
// lands just under 100 instead of blowing up.
// =============================================================================

/// Loss-average floor that keeps the RS ratio finite.
const LOSS_EPSILON: f64 = 0.001;

/// Compute the full RSI series for `closes` with look-back `period`.
///
/// Output element `i` corresponds to the close at index `period + i`; the
/// first `period` closes only supply deltas.  Empty when `period` is zero or
/// there are not enough closes for a single window.
pub fn calculate_rsi_series(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    let mut series = Vec::with_capacity(deltas.len() - period + 1);
    for window in deltas.windows(period) {
        let (sum_gain, sum_loss) = window.iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });

        let avg_gain = sum_gain / period_f;
        let avg_loss = sum_loss / period_f;

        let rs = avg_gain / avg_loss.max(LOSS_EPSILON);
        let rsi = 100.0 - 100.0 / (1.0 + rs);
        if !rsi.is_finite() {
            break;
        }
        series.push(rsi);
    }

    series
}

/// Most recent RSI value, or `None` when there is not enough history.
pub fn current_rsi(closes: &[f64], period: usize) -> Option<f64> {
    calculate_rsi_series(closes, period).last().copied()
}
