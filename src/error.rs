// =============================================================================
// Pipeline error taxonomy
// =============================================================================
//
// Four failure classes, each with its own degradation policy:
//   UpstreamUnavailable — data/AI provider unreachable or non-2xx.  At the
//                         per-symbol level this drops the symbol; at the
//                         authorization stage it degrades to "unauthorized".
//   InsufficientData    — fewer bars than an indicator or pattern requires.
//                         Drops the symbol, never aborts the run.
//   MalformedAiResponse — model output does not contain the expected JSON.
//                         Degrades to the stage's documented safe default.
//   RunTimeout          — the run-scoped wall-clock budget expired.  Fatal:
//                         the whole run is abandoned, partial results are
//                         never returned.
// =============================================================================

use thiserror::Error;

/// All the ways a pipeline run (or one of its symbols) can fail.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A data or AI provider was unreachable or returned a non-2xx status.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Fewer bars were available than the computation requires.
    #[error("insufficient data for {symbol}: {got} bars, need {need}")]
    InsufficientData {
        symbol: String,
        got: usize,
        need: usize,
    },

    /// Model output did not parse as the expected JSON contract.
    #[error("malformed AI response: {0}")]
    MalformedAiResponse(String),

    /// The overall run deadline expired.
    #[error("run exceeded the {0} second wall-clock budget")]
    RunTimeout(u64),
}

impl PipelineError {
    /// True when the error is fatal to the whole run (as opposed to a
    /// per-symbol or per-stage degradation).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RunTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeout_is_fatal() {
        assert!(PipelineError::RunTimeout(60).is_fatal());
        assert!(!PipelineError::UpstreamUnavailable("x".into()).is_fatal());
        assert!(!PipelineError::InsufficientData {
            symbol: "AAPL".into(),
            got: 5,
            need: 20,
        }
        .is_fatal());
        assert!(!PipelineError::MalformedAiResponse("not json".into()).is_fatal());
    }

    #[test]
    fn messages_name_the_failure() {
        let e = PipelineError::InsufficientData {
            symbol: "TSLA".into(),
            got: 12,
            need: 20,
        };
        assert_eq!(e.to_string(), "insufficient data for TSLA: 12 bars, need 20");
    }
}
