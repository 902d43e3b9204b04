// =============================================================================
// Central Application State — Meridian Analysis Engine
// =============================================================================
//
// The single source of truth for the running service.  Handlers hold an
// `Arc<AppState>`; each pipeline run reads the config once and works on its
// own immutable snapshots, so no mutable state is shared across symbol
// analyses.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for the mutable collections.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::ai::AiClient;
use crate::fundamentals::FundamentalsClient;
use crate::market_data::BarProvider;
use crate::pipeline::AnalysisReport;
use crate::runtime_config::RuntimeConfig;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;
/// Maximum number of completed run reports to retain.
const MAX_RECENT_RUNS: usize = 20;

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Central application state shared across handlers via `Arc<AppState>`.
pub struct AppState {
    /// Monotonically increasing version counter, bumped on every meaningful
    /// mutation so pollers can detect fresh data cheaply.
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: RwLock<RuntimeConfig>,

    // ── Upstream clients ────────────────────────────────────────────────
    pub bar_provider: BarProvider,
    pub fundamentals: FundamentalsClient,
    pub ai: AiClient,

    // ── Run history ─────────────────────────────────────────────────────
    pub recent_runs: RwLock<Vec<AnalysisReport>>,

    // ── Error log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    /// Instant the service started; used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState`.  The returned value is typically wrapped
    /// in `Arc` immediately.
    pub fn new(
        config: RuntimeConfig,
        bar_provider: BarProvider,
        fundamentals: FundamentalsClient,
        ai: AiClient,
    ) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            runtime_config: RwLock::new(config),
            bar_provider,
            fundamentals,
            ai,
            recent_runs: RwLock::new(Vec::new()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    /// Atomically increment the state version.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message.  The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted when the limit is
    /// reached.
    pub fn push_error(&self, msg: String) {
        let record = ErrorRecord {
            message: msg,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }

        self.increment_version();
    }

    // ── Run History ─────────────────────────────────────────────────────

    /// Record a completed run report.  Capped at [`MAX_RECENT_RUNS`].
    pub fn push_run(&self, report: AnalysisReport) {
        let mut runs = self.recent_runs.write();
        runs.push(report);
        while runs.len() > MAX_RECENT_RUNS {
            runs.remove(0);
        }

        self.increment_version();
    }

    /// The most recent completed run, if any.
    pub fn last_run(&self) -> Option<AnalysisReport> {
        self.recent_runs.read().last().cloned()
    }
}
