// =============================================================================
// Composite trend — direction from the MA stack, strength from a signal vote
// =============================================================================
//
// Direction comes from the price / SMA20 / SMA50 ordering:
//   price > SMA20 > SMA50  => bullish
//   price < SMA20 < SMA50  => bearish
//   anything else          => neutral
//
// With a short series the stack degrades: when SMA50 has not formed yet the
// price-vs-SMA20 comparison alone decides, and with neither average the
// direction is neutral.
//
// Strength counts confirming signals on the direction's side — RSI hemisphere,
// MACD histogram sign, price-vs-VWAP, OBV drift, and the EMA cross (which
// votes double).  4+ votes is strong, 2+ moderate, else weak.
// =============================================================================

use crate::types::{CrossState, ObvTrend, TrendDirection, TrendStrength, VwapPosition};

/// Composite trend verdict for the indicator snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeTrend {
    pub direction: TrendDirection,
    pub strength: TrendStrength,
}

/// Inputs the vote draws on.  All optional pieces simply don't vote when
/// their indicator is absent.
#[derive(Debug, Clone, Copy)]
pub struct TrendInputs {
    pub price: f64,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub rsi: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub vwap_position: Option<VwapPosition>,
    pub obv_trend: ObvTrend,
    pub ema_cross: CrossState,
}

/// Derive the composite trend from the assembled indicator inputs.
pub fn composite_trend(inputs: &TrendInputs) -> CompositeTrend {
    let direction = match (inputs.sma_20, inputs.sma_50) {
        (Some(s20), Some(s50)) if inputs.price > s20 && s20 > s50 => TrendDirection::Bullish,
        (Some(s20), Some(s50)) if inputs.price < s20 && s20 < s50 => TrendDirection::Bearish,
        (Some(_), Some(_)) => TrendDirection::Neutral,
        (Some(s20), None) if inputs.price > s20 => TrendDirection::Bullish,
        (Some(s20), None) if inputs.price < s20 => TrendDirection::Bearish,
        _ => TrendDirection::Neutral,
    };

    let votes = match direction {
        TrendDirection::Bullish => bullish_votes(inputs),
        TrendDirection::Bearish => bearish_votes(inputs),
        TrendDirection::Neutral => 0,
    };

    let strength = if votes >= 4 {
        TrendStrength::Strong
    } else if votes >= 2 {
        TrendStrength::Moderate
    } else {
        TrendStrength::Weak
    };

    CompositeTrend {
        direction,
        strength,
    }
}

fn bullish_votes(inputs: &TrendInputs) -> u32 {
    let mut votes = 0;
    if inputs.rsi.is_some_and(|r| r > 50.0) {
        votes += 1;
    }
    if inputs.macd_histogram.is_some_and(|h| h > 0.0) {
        votes += 1;
    }
    if inputs.vwap_position == Some(VwapPosition::Above) {
        votes += 1;
    }
    if inputs.obv_trend == ObvTrend::Accumulation {
        votes += 1;
    }
    if inputs.ema_cross == CrossState::GoldenCross {
        votes += 2;
    }
    votes
}

fn bearish_votes(inputs: &TrendInputs) -> u32 {
    let mut votes = 0;
    if inputs.rsi.is_some_and(|r| r < 50.0) {
        votes += 1;
    }
    if inputs.macd_histogram.is_some_and(|h| h < 0.0) {
        votes += 1;
    }
    if inputs.vwap_position == Some(VwapPosition::Below) {
        votes += 1;
    }
    if inputs.obv_trend == ObvTrend::Distribution {
        votes += 1;
    }
    if inputs.ema_cross == CrossState::DeathCross {
        votes += 2;
    }
    votes
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> TrendInputs {
        TrendInputs {
            price: 110.0,
            sma_20: Some(105.0),
            sma_50: Some(100.0),
            rsi: Some(50.0),
            macd_histogram: Some(0.0),
            vwap_position: Some(VwapPosition::At),
            obv_trend: ObvTrend::Neutral,
            ema_cross: CrossState::Neutral,
        }
    }

    #[test]
    fn direction_from_ma_stack_ordering() {
        let inputs = base_inputs();
        assert_eq!(composite_trend(&inputs).direction, TrendDirection::Bullish);

        let inputs = TrendInputs {
            price: 90.0,
            sma_20: Some(95.0),
            sma_50: Some(100.0),
            ..base_inputs()
        };
        assert_eq!(composite_trend(&inputs).direction, TrendDirection::Bearish);

        // Price between the averages: no clean stack.
        let inputs = TrendInputs {
            price: 102.0,
            sma_20: Some(105.0),
            sma_50: Some(100.0),
            ..base_inputs()
        };
        assert_eq!(composite_trend(&inputs).direction, TrendDirection::Neutral);
    }

    #[test]
    fn short_series_degrades_to_price_vs_sma20() {
        // SMA50 not formed yet: price above SMA20 still reads bullish.
        let inputs = TrendInputs {
            sma_50: None,
            ..base_inputs()
        };
        assert_eq!(composite_trend(&inputs).direction, TrendDirection::Bullish);

        // Neither average formed: nothing to lean on.
        let inputs = TrendInputs {
            sma_20: None,
            sma_50: None,
            ..base_inputs()
        };
        let trend = composite_trend(&inputs);
        assert_eq!(trend.direction, TrendDirection::Neutral);
        assert_eq!(trend.strength, TrendStrength::Weak);
    }

    #[test]
    fn strength_buckets() {
        // No confirming votes at all.
        assert_eq!(composite_trend(&base_inputs()).strength, TrendStrength::Weak);

        // RSI + MACD = 2 votes => moderate.
        let inputs = TrendInputs {
            rsi: Some(65.0),
            macd_histogram: Some(0.5),
            ..base_inputs()
        };
        assert_eq!(composite_trend(&inputs).strength, TrendStrength::Moderate);

        // RSI + MACD + golden cross (double) = 4 votes => strong.
        let inputs = TrendInputs {
            rsi: Some(65.0),
            macd_histogram: Some(0.5),
            ema_cross: CrossState::GoldenCross,
            ..base_inputs()
        };
        assert_eq!(composite_trend(&inputs).strength, TrendStrength::Strong);
    }

    #[test]
    fn votes_only_count_on_the_trend_side() {
        // A bullish stack with bearish confirmations stays weak.
        let inputs = TrendInputs {
            rsi: Some(30.0),
            macd_histogram: Some(-1.0),
            vwap_position: Some(VwapPosition::Below),
            obv_trend: ObvTrend::Distribution,
            ema_cross: CrossState::DeathCross,
            ..base_inputs()
        };
        let trend = composite_trend(&inputs);
        assert_eq!(trend.direction, TrendDirection::Bullish);
        assert_eq!(trend.strength, TrendStrength::Weak);
    }
}
