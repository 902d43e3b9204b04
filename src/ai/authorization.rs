// =============================================================================
// Authorization stage — the stricter gate on the single best candidate
// =============================================================================
//
// Runs only when screening names a non-skip best trade.  The stronger model
// gets a more detailed prompt (including the screener's own verdict) and a
// harder contract: 2:1 risk/reward minimum, cross-indicator confirmation,
// fundamentals sanity against the direction, and ATR-based stop sizing.
//
// This stage never fails the run.  A response that does not parse — or a
// transport error reaching the model at all — degrades to an unauthorized,
// low-conviction decision, which the planner turns into a veto.
// =============================================================================

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ai::client::AiClient;
use crate::ai::extract::extract;
use crate::ai::screening::{fmt_opt, TickerRanking};
use crate::analysis::TickerAnalysis;
use crate::types::{Conviction, TradeAction};

/// Allowed band for the model's position-size suggestion.
const MIN_POSITION_PCT: f64 = 0.01;
const MAX_POSITION_PCT: f64 = 0.05;

/// The authorizer's verdict on the screening stage's best candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub authorized: bool,
    pub action: TradeAction,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_reward_ratio: Option<f64>,
    /// Fraction of account equity to deploy, clamped to [0.01, 0.05].
    pub position_size_pct: f64,
    #[serde(default)]
    pub key_factors: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    pub conviction: Conviction,
}

// -----------------------------------------------------------------------------
// Wire shape
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(default)]
    authorized: bool,
    #[serde(default)]
    action: TradeAction,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    entry_price: Option<f64>,
    #[serde(default)]
    stop_loss: Option<f64>,
    #[serde(default)]
    take_profit: Option<f64>,
    #[serde(default)]
    risk_reward_ratio: Option<f64>,
    #[serde(default = "default_position_pct")]
    position_size_pct: f64,
    #[serde(default)]
    key_factors: Vec<String>,
    #[serde(default)]
    risks: Vec<String>,
    #[serde(default)]
    conviction: Conviction,
}

fn default_position_pct() -> f64 {
    0.02
}

// -----------------------------------------------------------------------------
// Stage
// -----------------------------------------------------------------------------

/// Second-pass strict single-candidate gate.
pub struct AuthorizationStage {
    model: String,
}

impl AuthorizationStage {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    /// Run the stage.  Infallible by design: every failure mode collapses to
    /// an unauthorized decision so the run always terminates with a verdict.
    pub async fn run(
        &self,
        client: &AiClient,
        analysis: &TickerAnalysis,
        screening: &TickerRanking,
        market_overview: &str,
    ) -> AuthorizationDecision {
        let prompt = self.build_prompt(analysis, screening, market_overview);

        let text = match client.complete(&self.model, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    symbol = %analysis.symbol,
                    error = %e,
                    "authorization model unreachable; vetoing"
                );
                return fallback_decision(format!("Authorization model unreachable: {e}"));
            }
        };

        self.parse_response(&text, &analysis.symbol)
    }

    /// Parse the model's text into a decision, degrading to unauthorized on
    /// contract violation.
    pub fn parse_response(&self, text: &str, symbol: &str) -> AuthorizationDecision {
        match extract::<RawDecision>(text) {
            Ok(raw) => {
                let decision = AuthorizationDecision {
                    authorized: raw.authorized,
                    action: raw.action,
                    confidence: raw.confidence.clamp(0.0, 1.0),
                    reasoning: raw.reasoning,
                    entry_price: raw.entry_price,
                    stop_loss: raw.stop_loss,
                    take_profit: raw.take_profit,
                    risk_reward_ratio: raw.risk_reward_ratio,
                    position_size_pct: raw
                        .position_size_pct
                        .clamp(MIN_POSITION_PCT, MAX_POSITION_PCT),
                    key_factors: raw.key_factors,
                    risks: raw.risks,
                    conviction: raw.conviction,
                };
                info!(
                    symbol,
                    authorized = decision.authorized,
                    conviction = %decision.conviction,
                    "authorization verdict parsed"
                );
                decision
            }
            Err(e) => {
                warn!(symbol, error = %e, "authorization response unusable; vetoing");
                fallback_decision("Authorization output could not be parsed".to_string())
            }
        }
    }

    /// Detailed single-candidate prompt with the stricter contract.
    pub fn build_prompt(
        &self,
        analysis: &TickerAnalysis,
        screening: &TickerRanking,
        market_overview: &str,
    ) -> String {
        let ind = &analysis.indicators;
        let mut p = String::with_capacity(2048);

        writeln!(
            p,
            "You are the senior risk officer. The screening desk proposes this trade; \
             authorize it only if it survives every check below.\n"
        )
        .ok();

        writeln!(p, "Market overview from the screening desk: {market_overview}").ok();
        writeln!(
            p,
            "Screening verdict: {} {} at confidence {:.2} (rank {}). Reasoning: {}",
            screening.action,
            screening.symbol,
            screening.confidence,
            screening.rank,
            screening.reasoning
        )
        .ok();
        if !screening.key_factors.is_empty() {
            writeln!(p, "Screening key factors: {}", screening.key_factors.join("; ")).ok();
        }

        writeln!(p, "\nFull snapshot of {}:", analysis.symbol).ok();
        writeln!(
            p,
            "Price ${} | trend {} ({}) | EMA cross {} | MACD cross {}",
            ind.price, ind.trend, ind.trend_strength, ind.ema_cross, ind.macd_cross
        )
        .ok();
        writeln!(
            p,
            "RSI {} | StochRSI K {} D {} ({}) | Bollinger position {} | ATR {} ({}%)",
            fmt_opt(ind.rsi_14),
            fmt_opt(ind.stoch_rsi_k),
            fmt_opt(ind.stoch_rsi_d),
            ind.stoch_signal,
            ind.bollinger_position
                .map_or("n/a".to_string(), |pos| pos.to_string()),
            fmt_opt(ind.atr_14),
            fmt_opt(ind.atr_pct)
        )
        .ok();
        writeln!(
            p,
            "Volume trend {} | OBV {} | VWAP position {} | support {} | resistance {}",
            ind.volume_trend,
            ind.obv_trend,
            ind.vwap_position
                .map_or("n/a".to_string(), |pos| pos.to_string()),
            fmt_opt(ind.support),
            fmt_opt(ind.resistance)
        )
        .ok();

        if !analysis.patterns.is_empty() {
            let list: Vec<String> = analysis
                .patterns
                .iter()
                .map(|pat| format!("{} ({}, {:.2}): {}", pat.name, pat.direction, pat.confidence, pat.description))
                .collect();
            writeln!(p, "Patterns: {}", list.join(" | ")).ok();
        }

        let f = &analysis.fundamentals;
        if !f.is_empty() {
            writeln!(
                p,
                "Fundamentals: P/E {}, P/B {}, margin {}, ROE {}, D/E {}, FCF {}",
                fmt_opt(f.pe_ratio),
                fmt_opt(f.price_to_book),
                fmt_opt(f.profit_margin),
                fmt_opt(f.return_on_equity),
                fmt_opt(f.debt_to_equity),
                fmt_opt(f.free_cash_flow)
            )
            .ok();
        }

        writeln!(
            p,
            "\nAuthorization contract:\n\
             - Require risk/reward of at least 2:1 from entry to target vs entry to stop.\n\
             - Require confirmation across momentum, trend, volume AND volatility indicators; \
               one strong signal is not enough.\n\
             - Check the fundamentals do not contradict the trade direction.\n\
             - Size the stop at 1.5x to 2x ATR from entry.\n\
             - position_size_pct must be between 0.01 and 0.05 of account equity.\n\
             - When in doubt, do not authorize.\n\
             \n\
             Respond with JSON only:\n\
             {{\"authorized\": false, \"action\": \"enter_long|enter_short|skip\", \
             \"confidence\": 0.0, \"reasoning\": \"...\", \"entry_price\": null, \
             \"stop_loss\": null, \"take_profit\": null, \"risk_reward_ratio\": null, \
             \"position_size_pct\": 0.02, \"key_factors\": [], \"risks\": [], \
             \"conviction\": \"high|medium|low\"}}"
        )
        .ok();

        p
    }
}

/// The documented safe default: unauthorized, low conviction.
fn fallback_decision(reasoning: String) -> AuthorizationDecision {
    AuthorizationDecision {
        authorized: false,
        action: TradeAction::Skip,
        confidence: 0.0,
        reasoning,
        entry_price: None,
        stop_loss: None,
        take_profit: None,
        risk_reward_ratio: None,
        position_size_pct: MIN_POSITION_PCT,
        key_factors: Vec::new(),
        risks: vec!["Authorization stage degraded to safe default".to_string()],
        conviction: Conviction::Low,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> AuthorizationStage {
        AuthorizationStage::new("strict-model")
    }

    #[test]
    fn unparseable_text_vetoes() {
        let decision = stage().parse_response("I cannot help with that.", "NVDA");
        assert!(!decision.authorized);
        assert_eq!(decision.conviction, Conviction::Low);
        assert_eq!(decision.action, TradeAction::Skip);
        assert_eq!(decision.confidence, 0.0);
    }

    #[test]
    fn valid_response_is_parsed_and_clamped() {
        let text = r#"```json
        {"authorized": true, "action": "enter_long", "confidence": 0.82,
         "reasoning": "trend, volume and volatility all confirm",
         "entry_price": 100.0, "stop_loss": 97.0, "take_profit": 106.0,
         "risk_reward_ratio": 2.0, "position_size_pct": 0.20,
         "key_factors": ["golden cross"], "risks": ["earnings next week"],
         "conviction": "high"}
        ```"#;

        let decision = stage().parse_response(text, "NVDA");
        assert!(decision.authorized);
        assert_eq!(decision.action, TradeAction::EnterLong);
        assert_eq!(decision.conviction, Conviction::High);
        // 0.20 is outside the allowed band and collapses to the 0.05 cap.
        assert!((decision.position_size_pct - 0.05).abs() < 1e-10);
        assert_eq!(decision.risks.len(), 1);
    }

    #[test]
    fn missing_fields_take_safe_defaults() {
        let decision = stage().parse_response(r#"{"reasoning": "thin response"}"#, "AAPL");
        assert!(!decision.authorized);
        assert_eq!(decision.action, TradeAction::Skip);
        assert_eq!(decision.conviction, Conviction::Low);
        // The default 2 % sizing survives the clamp.
        assert!((decision.position_size_pct - 0.02).abs() < 1e-10);
    }

    #[test]
    fn tiny_position_pct_is_floored() {
        let text = r#"{"authorized": true, "action": "enter_long", "confidence": 0.7,
                       "reasoning": "ok", "position_size_pct": 0.001, "conviction": "medium"}"#;
        let decision = stage().parse_response(text, "MSFT");
        assert!((decision.position_size_pct - 0.01).abs() < 1e-10);
    }
}
