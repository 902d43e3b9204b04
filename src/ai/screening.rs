// =============================================================================
// Screening stage — one cheap model call ranks the whole watchlist
// =============================================================================
//
// All analysed symbols go into a single consolidated prompt; the fast model
// returns a dense 1..N ranking with at most a couple of actionable picks and
// one designated best trade.
//
// The response contract is enforced after parsing, not trusted: entries are
// deduplicated against the input set, missing symbols are appended as skips,
// ranks are reassigned densely, and `best_trade` is cleared unless it names a
// non-skip entry.  A response that fails to parse at all degrades to the
// all-skip fallback so downstream stages always see a well-formed structure.
// =============================================================================

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ai::client::AiClient;
use crate::ai::extract::extract;
use crate::analysis::TickerAnalysis;
use crate::error::PipelineError;
use crate::types::TradeAction;

/// One symbol's slot in the screening ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerRanking {
    pub symbol: String,
    /// Dense 1-based rank; every input symbol appears exactly once.
    pub rank: u32,
    pub action: TradeAction,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub key_factors: Vec<String>,
}

/// Full screening verdict across the watchlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningRanking {
    pub rankings: Vec<TickerRanking>,
    /// Symbol of the single best opportunity, when one exists.
    pub best_trade: Option<String>,
    pub market_overview: String,
}

impl ScreeningRanking {
    /// The ranking entry behind `best_trade`, when it names one.
    pub fn best_entry(&self) -> Option<&TickerRanking> {
        let best = self.best_trade.as_deref()?;
        self.rankings
            .iter()
            .find(|r| r.symbol == best && r.action != TradeAction::Skip)
    }
}

// -----------------------------------------------------------------------------
// Wire shapes — lenient on input, normalised before anyone else sees them
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRanking {
    #[serde(default)]
    rankings: Vec<RawEntry>,
    #[serde(default)]
    best_trade: Option<String>,
    #[serde(default)]
    market_overview: String,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    symbol: String,
    #[serde(default)]
    rank: u32,
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
    target_price: Option<f64>,
    #[serde(default)]
    key_factors: Vec<String>,
}

// -----------------------------------------------------------------------------
// Stage
// -----------------------------------------------------------------------------

/// First-pass broad ranking across every analysed symbol.
pub struct ScreeningStage {
    model: String,
    min_confidence: f64,
}

impl ScreeningStage {
    pub fn new(model: impl Into<String>, min_confidence: f64) -> Self {
        Self {
            model: model.into(),
            min_confidence,
        }
    }

    /// Run the stage: one model round trip, then parse-or-fallback.
    ///
    /// A transport failure is an `UpstreamUnavailable` error (the caller maps
    /// it to a 502); a parse failure is not an error at all — it degrades to
    /// the all-skip ranking.
    pub async fn run(
        &self,
        client: &AiClient,
        analyses: &[TickerAnalysis],
    ) -> Result<ScreeningRanking, PipelineError> {
        let prompt = self.build_prompt(analyses);
        let text = client
            .complete(&self.model, &prompt)
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable(format!("screening model: {e}")))?;

        Ok(self.parse_response(&text, analyses))
    }

    /// Parse the model's text into a normalised ranking, falling back to
    /// all-skip when the JSON contract is not met.
    pub fn parse_response(&self, text: &str, analyses: &[TickerAnalysis]) -> ScreeningRanking {
        let symbols: Vec<&str> = analyses.iter().map(|a| a.symbol.as_str()).collect();

        match extract::<RawRanking>(text) {
            Ok(raw) => {
                let ranking = normalize(raw, &symbols);
                info!(
                    best_trade = ?ranking.best_trade,
                    ranked = ranking.rankings.len(),
                    "screening ranking parsed"
                );
                ranking
            }
            Err(e) => {
                warn!(error = %e, "screening response unusable; defaulting to all-skip");
                fallback_ranking(&symbols)
            }
        }
    }

    /// Consolidated prompt: every symbol's snapshot plus the decision rules.
    pub fn build_prompt(&self, analyses: &[TickerAnalysis]) -> String {
        let mut p = String::with_capacity(2048 + analyses.len() * 768);

        writeln!(
            p,
            "You are an intraday equity screener. Evaluate the following {} symbols \
             and rank every one of them.",
            analyses.len()
        )
        .ok();

        for analysis in analyses {
            p.push('\n');
            p.push_str(&format_symbol_block(analysis));
        }

        writeln!(
            p,
            "\nDecision rules:\n\
             - Recommend enter_long or enter_short only with confidence >= {:.2}; otherwise skip.\n\
             - At most 2-3 actionable picks; everything else is skip.\n\
             - Do not stack several highly correlated longs; pick the strongest.\n\
             - Rank ALL symbols densely from 1 (best) to {} (worst), each exactly once.\n\
             - Name the single strongest opportunity as best_trade, or null if nothing qualifies.\n\
             \n\
             Respond with JSON only:\n\
             {{\"rankings\": [{{\"symbol\": \"...\", \"rank\": 1, \"action\": \
             \"enter_long|enter_short|skip\", \"confidence\": 0.0, \"reasoning\": \"...\", \
             \"entry_price\": null, \"stop_loss\": null, \"target_price\": null, \
             \"key_factors\": []}}], \"best_trade\": null, \"market_overview\": \"...\"}}",
            self.min_confidence,
            analyses.len()
        )
        .ok();

        p
    }
}

/// All-skip ranking in input order — the documented safe default.
pub fn fallback_ranking(symbols: &[&str]) -> ScreeningRanking {
    let rankings = symbols
        .iter()
        .enumerate()
        .map(|(i, symbol)| TickerRanking {
            symbol: symbol.to_string(),
            rank: i as u32 + 1,
            action: TradeAction::Skip,
            confidence: 0.0,
            reasoning: "Screening output could not be parsed".to_string(),
            entry_price: None,
            stop_loss: None,
            target_price: None,
            key_factors: Vec::new(),
        })
        .collect();

    ScreeningRanking {
        rankings,
        best_trade: None,
        market_overview: "Screening unavailable; no action taken".to_string(),
    }
}

/// Enforce the ranking contract on whatever the model returned.
fn normalize(raw: RawRanking, symbols: &[&str]) -> ScreeningRanking {
    let allowed: HashSet<&str> = symbols.iter().copied().collect();

    // Keep the first entry per known symbol, in the model's rank order.
    let mut entries: Vec<RawEntry> = Vec::with_capacity(symbols.len());
    let mut seen: HashSet<String> = HashSet::new();
    let mut sorted = raw.rankings;
    sorted.sort_by_key(|e| e.rank);
    for entry in sorted {
        if allowed.contains(entry.symbol.as_str()) && seen.insert(entry.symbol.clone()) {
            entries.push(entry);
        }
    }

    // Append anything the model forgot, as skips.
    for symbol in symbols {
        if !seen.contains(*symbol) {
            entries.push(RawEntry {
                symbol: symbol.to_string(),
                rank: u32::MAX,
                action: TradeAction::Skip,
                confidence: 0.0,
                reasoning: "Not ranked by the screening model".to_string(),
                entry_price: None,
                stop_loss: None,
                target_price: None,
                key_factors: Vec::new(),
            });
        }
    }

    // Dense re-rank and clamp.
    let rankings: Vec<TickerRanking> = entries
        .into_iter()
        .enumerate()
        .map(|(i, e)| TickerRanking {
            symbol: e.symbol,
            rank: i as u32 + 1,
            action: e.action,
            confidence: e.confidence.clamp(0.0, 1.0),
            reasoning: e.reasoning,
            entry_price: e.entry_price,
            stop_loss: e.stop_loss,
            target_price: e.target_price,
            key_factors: e.key_factors,
        })
        .collect();

    // best_trade must name a non-skip entry.
    let best_trade = raw.best_trade.filter(|best| {
        rankings
            .iter()
            .any(|r| &r.symbol == best && r.action != TradeAction::Skip)
    });

    ScreeningRanking {
        rankings,
        best_trade,
        market_overview: raw.market_overview,
    }
}

// -----------------------------------------------------------------------------
// Prompt formatting
// -----------------------------------------------------------------------------

/// Fixed textual layout for one symbol's snapshot.
fn format_symbol_block(analysis: &TickerAnalysis) -> String {
    let ind = &analysis.indicators;
    let mut b = String::with_capacity(768);

    writeln!(
        b,
        "### {} — ${} ({} today, {} bars)",
        analysis.symbol,
        ind.price,
        analysis
            .day_change_pct
            .map_or("n/a".to_string(), |p| format!("{p:+.2}%")),
        analysis.bar_count
    )
    .ok();
    writeln!(
        b,
        "Trend: {} ({}) | EMA9 {} vs EMA21 {} ({})",
        ind.trend,
        ind.trend_strength,
        fmt_opt(ind.ema_9),
        fmt_opt(ind.ema_21),
        ind.ema_cross
    )
    .ok();
    writeln!(
        b,
        "SMA: 20={} 50={} 200={}",
        fmt_opt(ind.sma_20),
        fmt_opt(ind.sma_50),
        fmt_opt(ind.sma_200)
    )
    .ok();
    writeln!(
        b,
        "MACD: line {} signal {} hist {} ({})",
        fmt_opt(ind.macd_line),
        fmt_opt(ind.macd_signal),
        fmt_opt(ind.macd_histogram),
        ind.macd_cross
    )
    .ok();
    writeln!(
        b,
        "RSI(14): {} | StochRSI %K {} %D {} ({})",
        fmt_opt(ind.rsi_14),
        fmt_opt(ind.stoch_rsi_k),
        fmt_opt(ind.stoch_rsi_d),
        ind.stoch_signal
    )
    .ok();
    writeln!(
        b,
        "Bollinger: {} / {} / {} width {} ({})",
        fmt_opt(ind.bollinger_upper),
        fmt_opt(ind.bollinger_middle),
        fmt_opt(ind.bollinger_lower),
        fmt_opt(ind.bollinger_width),
        ind.bollinger_position
            .map_or("n/a".to_string(), |p| p.to_string())
    )
    .ok();
    writeln!(
        b,
        "ATR(14): {} ({}%) | RelVol {} ({}) | OBV {} | VWAP {} ({})",
        fmt_opt(ind.atr_14),
        fmt_opt(ind.atr_pct),
        fmt_opt(ind.relative_volume),
        ind.volume_trend,
        ind.obv_trend,
        fmt_opt(ind.vwap),
        ind.vwap_position
            .map_or("n/a".to_string(), |p| p.to_string())
    )
    .ok();
    writeln!(
        b,
        "Support {} / Resistance {}",
        fmt_opt(ind.support),
        fmt_opt(ind.resistance)
    )
    .ok();

    if analysis.patterns.is_empty() {
        writeln!(b, "Patterns: none").ok();
    } else {
        let list: Vec<String> = analysis
            .patterns
            .iter()
            .map(|p| format!("{} ({}, {:.2})", p.name, p.direction, p.confidence))
            .collect();
        writeln!(b, "Patterns: {}", list.join(", ")).ok();
    }

    let f = &analysis.fundamentals;
    if f.is_empty() {
        writeln!(b, "Fundamentals: unavailable").ok();
    } else {
        writeln!(
            b,
            "Fundamentals: {} | {} | mcap {} | P/E {} | P/B {} | margin {} | ROE {} | D/E {} | FCF {} | yield {}",
            f.name.as_deref().unwrap_or("n/a"),
            f.sector.as_deref().unwrap_or("n/a"),
            fmt_opt(f.market_cap),
            fmt_opt(f.pe_ratio),
            fmt_opt(f.price_to_book),
            fmt_opt(f.profit_margin),
            fmt_opt(f.return_on_equity),
            fmt_opt(f.debt_to_equity),
            fmt_opt(f.free_cash_flow),
            fmt_opt(f.dividend_yield),
        )
        .ok();
    }

    b
}

pub(crate) fn fmt_opt(v: Option<f64>) -> String {
    v.map_or("n/a".to_string(), |v| v.to_string())
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
    use chrono::{TimeZone, Utc};

    fn analysis(symbol: &str) -> TickerAnalysis {
        let bars: Vec<Bar> = (0..30)
            .map(|i| {
                let c = 100.0 + i as f64 * 0.5;
                Bar {
                    timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 300, 0).unwrap(),
                    open: c - 0.2,
                    high: c + 0.4,
                    low: c - 0.6,
                    close: c,
                    volume: 10_000.0,
                    vwap: None,
                }
            })
            .collect();
        build_analysis(symbol, &bars, Fundamentals::default(), 20, 78).unwrap()
    }

    fn stage() -> ScreeningStage {
        ScreeningStage::new("fast-model", 0.6)
    }

    #[test]
    fn unparseable_text_falls_back_to_all_skip() {
        let analyses = vec![analysis("AAPL"), analysis("MSFT"), analysis("NVDA")];
        let ranking = stage().parse_response("not json", &analyses);

        assert_eq!(ranking.rankings.len(), analyses.len());
        assert!(ranking
            .rankings
            .iter()
            .all(|r| r.action == TradeAction::Skip && r.confidence == 0.0));
        assert_eq!(ranking.best_trade, None);
        // Input order preserved.
        let symbols: Vec<&str> = ranking.rankings.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT", "NVDA"]);
    }

    #[test]
    fn valid_response_is_normalised() {
        let analyses = vec![analysis("AAPL"), analysis("MSFT"), analysis("NVDA")];
        let text = r#"```json
        {"rankings": [
            {"symbol": "NVDA", "rank": 1, "action": "enter_long", "confidence": 0.8,
             "reasoning": "strong trend", "key_factors": ["momentum"]},
            {"symbol": "AAPL", "rank": 2, "action": "skip", "confidence": 0.4, "reasoning": "chop"}
        ], "best_trade": "NVDA", "market_overview": "risk-on"}
        ```"#;

        let ranking = stage().parse_response(text, &analyses);
        assert_eq!(ranking.rankings.len(), 3);
        // Dense ranks 1..3 with the forgotten MSFT appended as a skip.
        let ranks: Vec<u32> = ranking.rankings.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(ranking.rankings[0].symbol, "NVDA");
        assert_eq!(ranking.rankings[2].symbol, "MSFT");
        assert_eq!(ranking.rankings[2].action, TradeAction::Skip);
        assert_eq!(ranking.best_trade.as_deref(), Some("NVDA"));
        assert!(ranking.best_entry().is_some());
    }

    #[test]
    fn best_trade_must_name_a_non_skip_entry() {
        let analyses = vec![analysis("AAPL"), analysis("MSFT")];

        // best_trade points at a symbol the model itself marked skip.
        let text = r#"{"rankings": [
            {"symbol": "AAPL", "rank": 1, "action": "skip", "confidence": 0.3, "reasoning": "x"},
            {"symbol": "MSFT", "rank": 2, "action": "skip", "confidence": 0.2, "reasoning": "y"}
        ], "best_trade": "AAPL", "market_overview": ""}"#;
        let ranking = stage().parse_response(text, &analyses);
        assert_eq!(ranking.best_trade, None);
        assert!(ranking.best_entry().is_none());

        // best_trade points at a symbol that was never in the input.
        let text = r#"{"rankings": [
            {"symbol": "AAPL", "rank": 1, "action": "enter_long", "confidence": 0.9, "reasoning": "x"}
        ], "best_trade": "TSLA", "market_overview": ""}"#;
        let ranking = stage().parse_response(text, &analyses);
        assert_eq!(ranking.best_trade, None);
    }

    #[test]
    fn duplicate_and_unknown_symbols_are_discarded() {
        let analyses = vec![analysis("AAPL"), analysis("MSFT")];
        let text = r#"{"rankings": [
            {"symbol": "AAPL", "rank": 1, "action": "enter_long", "confidence": 1.7, "reasoning": "a"},
            {"symbol": "AAPL", "rank": 2, "action": "skip", "confidence": 0.1, "reasoning": "dup"},
            {"symbol": "ZZZZ", "rank": 3, "action": "enter_short", "confidence": 0.9, "reasoning": "?"}
        ], "best_trade": "AAPL", "market_overview": ""}"#;

        let ranking = stage().parse_response(text, &analyses);
        assert_eq!(ranking.rankings.len(), 2);
        assert_eq!(ranking.rankings[0].symbol, "AAPL");
        // Confidence clamped into [0, 1].
        assert!((ranking.rankings[0].confidence - 1.0).abs() < 1e-10);
        assert_eq!(ranking.rankings[1].symbol, "MSFT");
    }

    #[test]
    fn prompt_embeds_every_symbol_and_the_rules() {
        let analyses = vec![analysis("AAPL"), analysis("MSFT")];
        let prompt = stage().build_prompt(&analyses);
        assert!(prompt.contains("### AAPL"));
        assert!(prompt.contains("### MSFT"));
        assert!(prompt.contains("confidence >= 0.60"));
        assert!(prompt.contains("Rank ALL symbols densely from 1 (best) to 2 (worst)"));
        assert!(prompt.contains("best_trade"));
    }
}
