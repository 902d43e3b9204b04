// =============================================================================
// Candlestick pattern detector
// =============================================================================
//
// A fixed catalog of formations evaluated against the last 1–3 bars of a
// series.  Rules are independent and order-free; several patterns may fire on
// the same tail.  Each carries a fixed confidence weight and a short
// human-readable rationale that ends up verbatim in the AI prompts.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::market_data::Bar;
use crate::types::PatternDirection;

/// Minimum series length before any rule is evaluated.
const MIN_BARS: usize = 5;

/// One recognised candlestick formation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    pub direction: PatternDirection,
    pub confidence: f64,
    pub description: String,
}

impl Pattern {
    fn new(
        name: &str,
        direction: PatternDirection,
        confidence: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            direction,
            confidence,
            description: description.into(),
        }
    }
}

/// Stateless façade over the pattern rules.
pub struct PatternDetector;

impl PatternDetector {
    /// Evaluate the full catalog against the tail of `bars`.
    ///
    /// Returns an empty set (never an error) for fewer than 5 bars.
    pub fn detect(bars: &[Bar]) -> Vec<Pattern> {
        if bars.len() < MIN_BARS {
            return Vec::new();
        }

        let mut found = Vec::new();
        found.extend(hammer_or_hanging_man(bars));
        found.extend(engulfing(bars));
        found.extend(doji(bars));
        found.extend(three_in_a_row(bars));
        found.extend(morning_star(bars));
        found
    }
}

/// Hammer / Hanging Man — long lower wick, small body on the last bar.
///
/// The same shape is bullish after a decline (Hammer) and bearish after an
/// advance (Hanging Man); the 3-back vs 1-back closes decide which leg we
/// were on.
fn hammer_or_hanging_man(bars: &[Bar]) -> Option<Pattern> {
    let last = bars.last()?;
    let range = last.range();
    if range <= 0.0 {
        return None;
    }

    let lower_wick = last.open.min(last.close) - last.low;
    if lower_wick <= range * 0.6 || last.body() >= range * 0.3 {
        return None;
    }

    let close_3_back = bars[bars.len() - 4].close;
    let close_1_back = bars[bars.len() - 2].close;
    let was_declining = close_3_back > close_1_back;

    Some(if was_declining {
        Pattern::new(
            "Hammer",
            PatternDirection::Bullish,
            0.65,
            "Long lower wick after a decline; sellers were absorbed",
        )
    } else {
        Pattern::new(
            "Hanging Man",
            PatternDirection::Bearish,
            0.65,
            "Long lower wick after an advance; buyers are losing control",
        )
    })
}

/// Engulfing — the last body fully contains and exceeds the previous,
/// opposite-coloured body.
fn engulfing(bars: &[Bar]) -> Option<Pattern> {
    let cur = &bars[bars.len() - 1];
    let prev = &bars[bars.len() - 2];

    if cur.body() <= prev.body() {
        return None;
    }

    if cur.is_bullish() && !prev.is_bullish() && cur.open <= prev.close && cur.close >= prev.open {
        return Some(Pattern::new(
            "Bullish Engulfing",
            PatternDirection::Bullish,
            0.75,
            "Up candle swallowed the prior down candle",
        ));
    }
    if !cur.is_bullish() && prev.is_bullish() && cur.open >= prev.close && cur.close <= prev.open {
        return Some(Pattern::new(
            "Bearish Engulfing",
            PatternDirection::Bearish,
            0.75,
            "Down candle swallowed the prior up candle",
        ));
    }
    None
}

/// Doji — the last bar's body is under 10 % of its range.  Indecision leans
/// against the prevailing leg, so the direction is the reversal side.
fn doji(bars: &[Bar]) -> Option<Pattern> {
    let last = bars.last()?;
    let range = last.range();
    if range <= 0.0 || last.body() >= range * 0.1 {
        return None;
    }

    let close_3_back = bars[bars.len() - 4].close;
    let close_1_back = bars[bars.len() - 2].close;
    let was_declining = close_3_back > close_1_back;

    Some(if was_declining {
        Pattern::new(
            "Doji",
            PatternDirection::Bullish,
            0.5,
            "Indecision candle after a decline; selling pressure stalling",
        )
    } else {
        Pattern::new(
            "Doji",
            PatternDirection::Bearish,
            0.5,
            "Indecision candle after an advance; buying pressure stalling",
        )
    })
}

/// Three White Soldiers / Three Black Crows — three consecutive bars in the
/// same direction.
fn three_in_a_row(bars: &[Bar]) -> Option<Pattern> {
    let tail = &bars[bars.len() - 3..];

    if tail.iter().all(|b| b.is_bullish()) {
        return Some(Pattern::new(
            "Three White Soldiers",
            PatternDirection::Bullish,
            0.7,
            "Three consecutive up candles; steady buying",
        ));
    }
    if tail.iter().all(|b| b.close < b.open) {
        return Some(Pattern::new(
            "Three Black Crows",
            PatternDirection::Bearish,
            0.7,
            "Three consecutive down candles; steady selling",
        ));
    }
    None
}

/// Morning Star — down candle, small-bodied middle candle, then an up candle
/// whose body is more than twice the middle one.
fn morning_star(bars: &[Bar]) -> Option<Pattern> {
    let first = &bars[bars.len() - 3];
    let middle = &bars[bars.len() - 2];
    let last = &bars[bars.len() - 1];

    let first_bearish = first.close < first.open;
    let middle_small = middle.body() < first.body();
    let last_strong = last.is_bullish() && last.body() > middle.body() * 2.0;

    (first_bearish && middle_small && last_strong).then(|| {
        Pattern::new(
            "Morning Star",
            PatternDirection::Bullish,
            0.8,
            "Sell-off, pause, then strong recovery candle",
        )
    })
}
