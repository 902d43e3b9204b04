// =============================================================================
// Analysis pipeline — batch fan-out, two-tier AI gating, deterministic plan
// =============================================================================
//
// Per-run state machine:
//
//   Idle -> BatchFetching -> Screening -> (AuthorizationPending |
//   SkipAuthorization) -> Planned | Vetoed | NoTrade
//
// `Failed` is the terminal state for a top-level error; a run timeout
// abandons all in-flight work and never returns partial results.  The two
// model calls are strictly sequential — authorization needs screening's
// verdict — and each is a single round trip with no internal retry.
// =============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ai::{AuthorizationDecision, AuthorizationStage, ScreeningRanking, ScreeningStage, TickerRanking};
use crate::analysis::{analyze_symbol, build_analysis, TickerAnalysis};
use crate::app_state::AppState;
use crate::error::PipelineError;
use crate::execution::{ExecutionPlan, ExecutionPlanner};
use crate::fundamentals::Fundamentals;
use crate::indicators::{round2, Indicators};
use crate::patterns::Pattern;
use crate::runtime_config::RuntimeConfig;
use crate::scheduler::BatchScheduler;
use crate::types::TradeAction;

/// Stop distance in ATRs for the single-symbol risk assessment.
const STOP_ATR_MULTIPLIER: f64 = 1.5;
/// Target distance as a multiple of the stop distance (2:1 reward/risk).
const TARGET_RISK_MULTIPLE: f64 = 2.0;

// =============================================================================
// Run phases
// =============================================================================

/// Where a run is (or ended up) in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    BatchFetching,
    Screening,
    AuthorizationPending,
    SkipAuthorization,
    Planned,
    Vetoed,
    NoTrade,
    Failed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::BatchFetching => "batch_fetching",
            Self::Screening => "screening",
            Self::AuthorizationPending => "authorization_pending",
            Self::SkipAuthorization => "skip_authorization",
            Self::Planned => "planned",
            Self::Vetoed => "vetoed",
            Self::NoTrade => "no_trade",
            Self::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

// =============================================================================
// Report types
// =============================================================================

/// Which requested symbols survived the fetch/analysis step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistScan {
    pub requested: Vec<String>,
    pub analyzed: Vec<String>,
    pub dropped: Vec<String>,
}

/// Per-symbol market snapshot embedded in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataSummary {
    pub symbol: String,
    pub last_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_change_pct: Option<f64>,
    pub bar_count: usize,
    pub indicators: Indicators,
}

/// All step payloads of one full-watchlist run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSteps {
    pub watchlist_scan: WatchlistScan,
    pub market_data: Vec<MarketDataSummary>,
    pub fundamentals: BTreeMap<String, Fundamentals>,
    pub pattern_summary: BTreeMap<String, Vec<Pattern>>,
    pub ai_ranking: ScreeningRanking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_analysis: Option<AuthorizationDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionPlan>,
}

/// Structured result of one full pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: String,
    pub timestamp: String,
    pub watchlist: Vec<String>,
    pub phase: RunPhase,
    pub steps: AnalysisSteps,
}

/// Deterministic risk framing for the single-symbol endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atr_14: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atr_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_stop: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resistance: Option<f64>,
}

/// Structured result of one single-symbol run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleReport {
    pub run_id: String,
    pub timestamp: String,
    pub symbol: String,
    pub patterns: Vec<Pattern>,
    pub indicators: Indicators,
    pub ai_evaluation: TickerRanking,
    pub risk_assessment: RiskAssessment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionPlan>,
}

// =============================================================================
// Full-watchlist run
// =============================================================================

/// Run the full pipeline over `symbols` (or the configured watchlist when
/// `None`/empty), bounded by the configured wall-clock budget.
pub async fn run_pipeline(
    state: &Arc<AppState>,
    symbols: Option<Vec<String>>,
) -> Result<AnalysisReport, PipelineError> {
    let config = state.runtime_config.read().clone();
    let watchlist = match symbols {
        Some(list) if !list.is_empty() => list,
        _ => config.watchlist.clone(),
    };

    let budget = Duration::from_secs(config.run_timeout_secs);
    match tokio::time::timeout(budget, run_inner(state, &config, watchlist)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                budget_secs = config.run_timeout_secs,
                "run abandoned at the wall-clock budget; no partial results"
            );
            Err(PipelineError::RunTimeout(config.run_timeout_secs))
        }
    }
}

async fn run_inner(
    state: &Arc<AppState>,
    config: &RuntimeConfig,
    watchlist: Vec<String>,
) -> Result<AnalysisReport, PipelineError> {
    let run_id = uuid::Uuid::new_v4().to_string();
    info!(run_id = %run_id, symbols = ?watchlist, phase = %RunPhase::BatchFetching, "pipeline run started");

    // ── Batch fan-out: per-symbol analyses ──────────────────────────────
    let scheduler = BatchScheduler::new(config.batch_size, config.batch_delay_ms);
    let analyses: Vec<TickerAnalysis> = scheduler
        .run(&watchlist, |symbol| {
            let state = state.clone();
            let config = config.clone();
            async move {
                analyze_symbol(&symbol, &state.bar_provider, &state.fundamentals, &config).await
            }
        })
        .await;

    if analyses.is_empty() {
        return Err(PipelineError::InsufficientData {
            symbol: watchlist.join(","),
            got: 0,
            need: 1,
        });
    }

    // ── Screening: one call ranks everything ────────────────────────────
    info!(run_id = %run_id, analyzed = analyses.len(), phase = %RunPhase::Screening, "screening watchlist");
    let screening = ScreeningStage::new(&config.screening_model, config.min_confidence);
    let ranking = screening.run(&state.ai, &analyses).await?;

    // ── Authorization: only the best candidate, only when one exists ────
    let (phase, deep_analysis, execution) = match ranking.best_entry() {
        Some(best) => {
            info!(run_id = %run_id, symbol = %best.symbol, phase = %RunPhase::AuthorizationPending, "authorizing best candidate");
            // best_entry() only returns symbols taken from the analyses.
            let candidate = analyses
                .iter()
                .find(|a| a.symbol == best.symbol)
                .ok_or_else(|| {
                    PipelineError::MalformedAiResponse(format!(
                        "best_trade {} has no analysis",
                        best.symbol
                    ))
                })?;

            let authorization = AuthorizationStage::new(&config.authorization_model);
            let decision = authorization
                .run(&state.ai, candidate, best, &ranking.market_overview)
                .await;

            let plan = ExecutionPlanner::plan(
                &decision,
                candidate,
                best.confidence,
                config.account_equity,
                config.min_confidence,
            );

            let phase = if plan.would_execute {
                RunPhase::Planned
            } else if plan.vetoed_by_pro {
                RunPhase::Vetoed
            } else {
                RunPhase::NoTrade
            };
            (phase, Some(decision), Some(plan))
        }
        None => {
            info!(run_id = %run_id, phase = %RunPhase::SkipAuthorization, "no actionable candidate");
            (RunPhase::NoTrade, None, None)
        }
    };

    let report = assemble_report(run_id, watchlist, analyses, ranking, deep_analysis, execution, phase);
    info!(run_id = %report.run_id, phase = %report.phase, "pipeline run finished");
    Ok(report)
}

fn assemble_report(
    run_id: String,
    watchlist: Vec<String>,
    analyses: Vec<TickerAnalysis>,
    ai_ranking: ScreeningRanking,
    deep_analysis: Option<AuthorizationDecision>,
    execution: Option<ExecutionPlan>,
    phase: RunPhase,
) -> AnalysisReport {
    let analyzed: Vec<String> = analyses.iter().map(|a| a.symbol.clone()).collect();
    let dropped: Vec<String> = watchlist
        .iter()
        .filter(|s| !analyzed.contains(s))
        .cloned()
        .collect();

    let market_data = analyses
        .iter()
        .map(|a| MarketDataSummary {
            symbol: a.symbol.clone(),
            last_price: a.last_price,
            day_change_pct: a.day_change_pct,
            bar_count: a.bar_count,
            indicators: a.indicators.clone(),
        })
        .collect();

    let fundamentals = analyses
        .iter()
        .map(|a| (a.symbol.clone(), a.fundamentals.clone()))
        .collect();

    let pattern_summary = analyses
        .iter()
        .map(|a| (a.symbol.clone(), a.patterns.clone()))
        .collect();

    AnalysisReport {
        run_id,
        timestamp: chrono::Utc::now().to_rfc3339(),
        watchlist: watchlist.clone(),
        phase,
        steps: AnalysisSteps {
            watchlist_scan: WatchlistScan {
                requested: watchlist,
                analyzed,
                dropped,
            },
            market_data,
            fundamentals,
            pattern_summary,
            ai_ranking,
            deep_analysis,
            execution,
        },
    }
}

// =============================================================================
// Single-symbol run
// =============================================================================

/// Run the single-symbol variant, bounded by the same wall-clock budget.
pub async fn run_single(
    state: &Arc<AppState>,
    symbol: String,
) -> Result<SingleReport, PipelineError> {
    let config = state.runtime_config.read().clone();
    let budget = Duration::from_secs(config.run_timeout_secs);

    match tokio::time::timeout(budget, run_single_inner(state, &config, symbol)).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError::RunTimeout(config.run_timeout_secs)),
    }
}

async fn run_single_inner(
    state: &Arc<AppState>,
    config: &RuntimeConfig,
    symbol: String,
) -> Result<SingleReport, PipelineError> {
    let run_id = uuid::Uuid::new_v4().to_string();

    // Unlike the batch path, a fetch failure here is the caller's problem —
    // there is no batch to fall back on.
    let bars = state
        .bar_provider
        .get_bars(&symbol, &config.bar_granularity, config.bar_limit)
        .await
        .map_err(|e| PipelineError::UpstreamUnavailable(format!("bar provider: {e}")))?;

    let bar_count = bars.len();
    let fundamentals = state.fundamentals.aggregate(&symbol).await;
    let analysis = build_analysis(
        &symbol,
        &bars,
        fundamentals,
        config.min_bars,
        config.session_bars,
    )
    .ok_or(PipelineError::InsufficientData {
        symbol: symbol.clone(),
        got: bar_count,
        need: config.min_bars,
    })?;

    // One-symbol "ranking" reuses the screening contract verbatim.
    let analyses = std::slice::from_ref(&analysis);
    let screening = ScreeningStage::new(&config.screening_model, config.min_confidence);
    let ranking = screening.run(&state.ai, analyses).await?;
    let evaluation = ranking.rankings[0].clone();

    let risk_assessment = risk_assessment(&analysis, evaluation.action);

    let execution = match ranking.best_entry() {
        Some(best) => {
            let authorization = AuthorizationStage::new(&config.authorization_model);
            let decision = authorization
                .run(&state.ai, &analysis, best, &ranking.market_overview)
                .await;
            Some(ExecutionPlanner::plan(
                &decision,
                &analysis,
                best.confidence,
                config.account_equity,
                config.min_confidence,
            ))
        }
        None => None,
    };

    Ok(SingleReport {
        run_id,
        timestamp: chrono::Utc::now().to_rfc3339(),
        symbol,
        patterns: analysis.patterns.clone(),
        indicators: analysis.indicators.clone(),
        ai_evaluation: evaluation,
        risk_assessment,
        execution,
    })
}

/// ATR-framed stop/target suggestion around the current price.
fn risk_assessment(analysis: &TickerAnalysis, action: TradeAction) -> RiskAssessment {
    let ind = &analysis.indicators;
    let price = analysis.last_price;

    let (suggested_stop, suggested_target) = match ind.atr_14 {
        Some(atr) if atr > 0.0 => {
            let risk = atr * STOP_ATR_MULTIPLIER;
            // Stops sit against the trade direction; shorts mirror longs.
            let (stop, target) = if action == TradeAction::EnterShort {
                (price + risk, price - risk * TARGET_RISK_MULTIPLE)
            } else {
                (price - risk, price + risk * TARGET_RISK_MULTIPLE)
            };
            (Some(round2(stop)), Some(round2(target)))
        }
        _ => (None, None),
    };

    RiskAssessment {
        atr_14: ind.atr_14,
        atr_pct: ind.atr_pct,
        suggested_stop,
        suggested_target,
        support: ind.support,
        resistance: ind.resistance,
    }
}
