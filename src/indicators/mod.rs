// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicator suite.  Every
// function returns `Option<T>` (or an empty series) so callers are forced to
// handle insufficient-data and numerical-edge-case scenarios — an indicator
// without enough history is absent, never a zero standing in for "unknown".
//
// `IndicatorEngine::compute` assembles the full snapshot for the last bar of
// a series and applies boundary rounding: 2 decimals for price-scale values,
// 4 for MACD-scale values, so downstream comparisons stay deterministic.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod stoch_rsi;
pub mod trend;
pub mod volume;
pub mod vwap;

use serde::{Deserialize, Serialize};

use crate::market_data::Bar;
use crate::types::{
    BandPosition, CrossState, ObvTrend, StochSignal, TrendDirection, TrendStrength, VolumeTrend,
    VwapPosition,
};

/// Look-back for the rolling support/resistance scan.
const SUPPORT_RESISTANCE_WINDOW: usize = 50;

/// Read-only indicator snapshot keyed to the last bar of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub price: f64,

    // Moving averages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_9: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema_21: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma_20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma_50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma_200: Option<f64>,
    pub ema_cross: CrossState,

    // MACD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd_line: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd_signal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd_histogram: Option<f64>,
    pub macd_cross: CrossState,

    // Oscillators
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi_14: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stoch_rsi_k: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stoch_rsi_d: Option<f64>,
    pub stoch_signal: StochSignal,

    // Volatility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bollinger_upper: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bollinger_middle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bollinger_lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bollinger_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bollinger_position: Option<BandPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atr_14: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atr_pct: Option<f64>,

    // Volume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_volume: Option<f64>,
    pub volume_trend: VolumeTrend,
    pub obv_trend: ObvTrend,

    // VWAP
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vwap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vwap_position: Option<VwapPosition>,

    // Composite
    pub trend: TrendDirection,
    pub trend_strength: TrendStrength,

    // Rolling levels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resistance: Option<f64>,
}

/// Stateless façade over the indicator functions.
pub struct IndicatorEngine;

impl IndicatorEngine {
    /// Compute the full indicator snapshot for `bars` (ascending time).
    ///
    /// `session_bars` sets the trailing VWAP window (one trading session of
    /// bars at the series' granularity).  Returns `None` only for an empty
    /// series; with any history at all, individual indicators that lack
    /// enough bars are simply absent in the snapshot.
    pub fn compute(bars: &[Bar], session_bars: usize) -> Option<Indicators> {
        let last = bars.last()?;
        let price = last.close;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let ema_9 = ema::calculate_ema(&closes, 9).last().copied();
        let ema_21 = ema::calculate_ema(&closes, 21).last().copied();
        let sma_20 = ema::calculate_sma(&closes, 20);
        let sma_50 = ema::calculate_sma(&closes, 50);
        let sma_200 = ema::calculate_sma(&closes, 200);
        let ema_cross = ema::ema_cross_state(&closes);

        let macd = macd::calculate_macd(&closes);
        let rsi_14 = rsi::current_rsi(&closes, 14);
        let stoch = stoch_rsi::calculate_stoch_rsi(&closes, 14, 14, 3);
        let bb = bollinger::calculate_bollinger(&closes, 20, 2.0);
        let atr_14 = atr::calculate_atr(bars, 14);
        let atr_pct = atr::calculate_atr_pct(bars, 14);
        let vol = volume::relative_volume(bars);
        let obv_trend = obv::obv_trend(bars);
        let vwap = vwap::calculate_vwap(bars, session_bars);

        let composite = trend::composite_trend(&trend::TrendInputs {
            price,
            sma_20,
            sma_50,
            rsi: rsi_14,
            macd_histogram: macd.as_ref().map(|m| m.histogram),
            vwap_position: vwap.as_ref().map(|v| v.position),
            obv_trend,
            ema_cross,
        });

        let (support, resistance) = if bars.len() >= SUPPORT_RESISTANCE_WINDOW {
            let window = &bars[bars.len() - SUPPORT_RESISTANCE_WINDOW..];
            let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let high = window
                .iter()
                .map(|b| b.high)
                .fold(f64::NEG_INFINITY, f64::max);
            (Some(low), Some(high))
        } else {
            (None, None)
        };

        Some(Indicators {
            price: round2(price),
            ema_9: ema_9.map(round2),
            ema_21: ema_21.map(round2),
            sma_20: sma_20.map(round2),
            sma_50: sma_50.map(round2),
            sma_200: sma_200.map(round2),
            ema_cross,
            macd_line: macd.as_ref().map(|m| round4(m.line)),
            macd_signal: macd.as_ref().map(|m| round4(m.signal)),
            macd_histogram: macd.as_ref().map(|m| round4(m.histogram)),
            macd_cross: macd.as_ref().map_or(CrossState::Neutral, |m| m.cross),
            rsi_14: rsi_14.map(round2),
            stoch_rsi_k: stoch.as_ref().map(|s| round2(s.k)),
            stoch_rsi_d: stoch.as_ref().map(|s| round2(s.d)),
            stoch_signal: stoch.as_ref().map_or(StochSignal::Neutral, |s| s.signal),
            bollinger_upper: bb.as_ref().map(|b| round2(b.upper)),
            bollinger_middle: bb.as_ref().map(|b| round2(b.middle)),
            bollinger_lower: bb.as_ref().map(|b| round2(b.lower)),
            bollinger_width: bb.as_ref().map(|b| round4(b.width)),
            bollinger_position: bb.as_ref().map(|b| b.position),
            atr_14: atr_14.map(round2),
            atr_pct: atr_pct.map(round2),
            relative_volume: vol.as_ref().map(|v| round2(v.relative_volume)),
            volume_trend: vol.as_ref().map_or(VolumeTrend::Normal, |v| v.trend),
            obv_trend,
            vwap: vwap.as_ref().map(|v| round2(v.vwap)),
            vwap_position: vwap.as_ref().map(|v| v.position),
            trend: composite.direction,
            trend_strength: composite.strength,
            support: support.map(round2),
            resistance: resistance.map(round2),
        })
    }
}

/// Round to 2 decimals (price-scale boundary precision).
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Round to 4 decimals (MACD-scale boundary precision).
pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
