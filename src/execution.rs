// =============================================================================
// Execution planner — deterministic sizing from an authorization verdict
// =============================================================================
//
// Pure arithmetic, no model involvement:
//   position_size = floor(equity * position_size_pct / price)
//   stop          = decision stop, else price * 0.98
//   target        = decision target, else price * 1.04
//   risk_reward   = decision ratio, else |target - price| / max(|price - stop|, 0.01)
//   would_execute = authorized AND confidence >= threshold
//
// The no-signal and vetoed-signal outcomes are distinct on purpose: when the
// authorizer rejects a candidate the screener was confident about, the plan
// carries `vetoed_by_pro = true` with zero shares, so the veto is observable
// instead of the opportunity silently disappearing.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::ai::authorization::AuthorizationDecision;
use crate::analysis::TickerAnalysis;
use crate::indicators::round2;
use crate::types::TradeAction;

/// Default stop distance when the model supplies none (2 % below entry).
const DEFAULT_STOP_FACTOR: f64 = 0.98;
/// Default target distance when the model supplies none (4 % above entry).
const DEFAULT_TARGET_FACTOR: f64 = 1.04;
/// Floor on the stop distance in the risk/reward division.
const MIN_RISK_DISTANCE: f64 = 0.01;

/// Concrete sized order (or documented no-trade/veto outcome).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub symbol: String,
    pub side: TradeAction,
    /// Whole shares; zero for no-trade and vetoed outcomes.
    pub position_size: u64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward: f64,
    pub max_loss: f64,
    pub max_gain: f64,
    pub account_equity: f64,
    pub would_execute: bool,
    /// True when the authorizer rejected a screening pick with confidence at
    /// or above the execution threshold.
    pub vetoed_by_pro: bool,
    pub risks: Vec<String>,
}

/// Stateless façade over the sizing arithmetic.
pub struct ExecutionPlanner;

impl ExecutionPlanner {
    /// Derive the plan for one authorization verdict.
    ///
    /// # Arguments
    /// * `decision`             — the authorizer's verdict.
    /// * `analysis`             — the candidate's snapshot (price source).
    /// * `screening_confidence` — the screener's confidence in this pick.
    /// * `equity`               — notional account equity.
    /// * `min_confidence`       — execution threshold (0.6).
    pub fn plan(
        decision: &AuthorizationDecision,
        analysis: &TickerAnalysis,
        screening_confidence: f64,
        equity: f64,
        min_confidence: f64,
    ) -> ExecutionPlan {
        let price = analysis.last_price;

        let entry_price = decision.entry_price.filter(|p| *p > 0.0).unwrap_or(price);
        let stop_loss = decision
            .stop_loss
            .filter(|p| *p > 0.0)
            .unwrap_or(price * DEFAULT_STOP_FACTOR);
        let take_profit = decision
            .take_profit
            .filter(|p| *p > 0.0)
            .unwrap_or(price * DEFAULT_TARGET_FACTOR);

        let risk_reward = decision.risk_reward_ratio.unwrap_or_else(|| {
            (take_profit - entry_price).abs() / (entry_price - stop_loss).abs().max(MIN_RISK_DISTANCE)
        });

        let would_execute = decision.authorized && decision.confidence >= min_confidence;
        let vetoed_by_pro = !decision.authorized && screening_confidence >= min_confidence;

        let position_size = if decision.authorized && entry_price > 0.0 {
            (equity * decision.position_size_pct / entry_price).floor() as u64
        } else {
            0
        };

        let max_loss = round2(position_size as f64 * (entry_price - stop_loss).abs());
        let max_gain = round2(position_size as f64 * (take_profit - entry_price).abs());

        ExecutionPlan {
            symbol: analysis.symbol.clone(),
            side: decision.action,
            position_size,
            entry_price: round2(entry_price),
            stop_loss: round2(stop_loss),
            take_profit: round2(take_profit),
            risk_reward: round2(risk_reward),
            max_loss,
            max_gain,
            account_equity: equity,
            would_execute,
            vetoed_by_pro,
            risks: decision.risks.clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::build_analysis;
    use crate::fundamentals::Fundamentals;
    use crate::market_data::Bar;
    use crate::types::Conviction;
    use chrono::{TimeZone, Utc};

    /// Flat series pinned at `price` so the snapshot's last price is exact.
    fn analysis_at(price: f64) -> TickerAnalysis {
        let bars: Vec<Bar> = (0..25)
            .map(|i| Bar {
                timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 300, 0).unwrap(),
                open: price,
                high: price,
                low: price,
                close: price,
                volume: 10_000.0,
                vwap: None,
            })
            .collect();
        build_analysis("TEST", &bars, Fundamentals::default(), 20, 78).unwrap()
    }

    fn decision(authorized: bool, confidence: f64) -> AuthorizationDecision {
        AuthorizationDecision {
            authorized,
            action: TradeAction::EnterLong,
            confidence,
            reasoning: "test".to_string(),
            entry_price: None,
            stop_loss: None,
            take_profit: None,
            risk_reward_ratio: None,
            position_size_pct: 0.02,
            key_factors: Vec::new(),
            risks: Vec::new(),
            conviction: Conviction::Medium,
        }
    }

    #[test]
    fn reference_sizing_example() {
        // price 100, equity 100k, 2 % => 20 shares; stop 98 / target 104 =>
        // risk_reward 2.0, max_loss 40, max_gain 80.
        let mut d = decision(true, 0.8);
        d.stop_loss = Some(98.0);
        d.take_profit = Some(104.0);

        let plan = ExecutionPlanner::plan(&d, &analysis_at(100.0), 0.8, 100_000.0, 0.6);
        assert_eq!(plan.position_size, 20);
        assert!((plan.risk_reward - 2.0).abs() < 1e-10);
        assert!((plan.max_loss - 40.0).abs() < 1e-10);
        assert!((plan.max_gain - 80.0).abs() < 1e-10);
        assert!(plan.would_execute);
        assert!(!plan.vetoed_by_pro);
    }

    #[test]
    fn defaults_fill_missing_stop_and_target() {
        let plan = ExecutionPlanner::plan(&decision(true, 0.7), &analysis_at(100.0), 0.7, 100_000.0, 0.6);
        assert!((plan.stop_loss - 98.0).abs() < 1e-10);
        assert!((plan.take_profit - 104.0).abs() < 1e-10);
        assert!((plan.risk_reward - 2.0).abs() < 1e-10);
    }

    #[test]
    fn veto_path_is_explicit() {
        // Authorizer said no, screener was confident: zero shares, flagged.
        let plan = ExecutionPlanner::plan(&decision(false, 0.0), &analysis_at(100.0), 0.75, 100_000.0, 0.6);
        assert!(!plan.would_execute);
        assert!(plan.vetoed_by_pro);
        assert_eq!(plan.position_size, 0);
    }

    #[test]
    fn low_screening_confidence_is_no_signal_not_veto() {
        let plan = ExecutionPlanner::plan(&decision(false, 0.0), &analysis_at(100.0), 0.3, 100_000.0, 0.6);
        assert!(!plan.would_execute);
        assert!(!plan.vetoed_by_pro);
        assert_eq!(plan.position_size, 0);
    }

    #[test]
    fn authorized_but_timid_does_not_execute() {
        let plan = ExecutionPlanner::plan(&decision(true, 0.5), &analysis_at(100.0), 0.8, 100_000.0, 0.6);
        assert!(!plan.would_execute);
        assert!(!plan.vetoed_by_pro);
        // Sizing is still reported for observability.
        assert_eq!(plan.position_size, 20);
    }

    #[test]
    fn position_size_floors_fractional_shares() {
        // 100k * 0.02 / 333 = 6.006 => 6 shares.
        let plan = ExecutionPlanner::plan(&decision(true, 0.9), &analysis_at(333.0), 0.9, 100_000.0, 0.6);
        assert_eq!(plan.position_size, 6);
    }

    #[test]
    fn degenerate_stop_distance_is_floored() {
        // Stop on top of entry: the 0.01 floor keeps the division finite.
        let mut d = decision(true, 0.9);
        d.stop_loss = Some(100.0);
        d.take_profit = Some(104.0);
        let plan = ExecutionPlanner::plan(&d, &analysis_at(100.0), 0.9, 100_000.0, 0.6);
        assert!((plan.risk_reward - 400.0).abs() < 1e-10);
    }
}
