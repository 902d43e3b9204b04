// =============================================================================
// Batch scheduler — bounded fan-out under an upstream rate limit
// =============================================================================
//
// The bar provider tolerates roughly 5 requests a minute and every symbol
// costs 2 calls, so the scheduler runs symbols in windows of 3 with a 1.5 s
// pause between windows.  This is backpressure policy, not a performance
// knob: batches are fully parallel inside, strictly sequential between, and
// the pause is skipped after the final batch.
//
// A symbol that fails resolves to `None` and is filtered out; the batch and
// the run carry on.
// =============================================================================

use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, info};

/// Fixed-window batch runner.
pub struct BatchScheduler {
    batch_size: usize,
    batch_delay: Duration,
}

impl BatchScheduler {
    /// # Arguments
    /// * `batch_size`     — symbols analysed concurrently per window.
    /// * `batch_delay_ms` — pause between windows (skipped after the last).
    pub fn new(batch_size: usize, batch_delay_ms: u64) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_delay: Duration::from_millis(batch_delay_ms),
        }
    }

    /// Number of batches `n` items split into.
    pub fn batch_count(&self, n: usize) -> usize {
        n.div_ceil(self.batch_size)
    }

    /// Number of inter-batch pauses for `n` items (one fewer than batches).
    pub fn delay_count(&self, n: usize) -> usize {
        self.batch_count(n).saturating_sub(1)
    }

    /// Fan `symbols` out through `analyze`, respecting the batch windows.
    ///
    /// Failed symbols (`None` results) are dropped from the output; the
    /// survivors keep their input order.
    pub async fn run<T, F, Fut>(&self, symbols: &[String], analyze: F) -> Vec<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let total_batches = self.batch_count(symbols.len());
        let mut results = Vec::with_capacity(symbols.len());

        for (index, batch) in symbols.chunks(self.batch_size).enumerate() {
            debug!(
                batch = index + 1,
                total_batches,
                size = batch.len(),
                "processing batch"
            );

            let futures = batch.iter().map(|symbol| analyze(symbol.clone()));
            results.extend(join_all(futures).await.into_iter().flatten());

            // Rate-limit accommodation, not error recovery: pause between
            // batches only.
            if index + 1 < total_batches {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        info!(
            requested = symbols.len(),
            usable = results.len(),
            "batch fan-out complete"
        );
        results
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn symbols(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("SYM{i}")).collect()
    }

    #[test]
    fn seven_symbols_make_three_batches_and_two_delays() {
        let scheduler = BatchScheduler::new(3, 1500);
        assert_eq!(scheduler.batch_count(7), 3);
        assert_eq!(scheduler.delay_count(7), 2);
    }

    #[test]
    fn batch_arithmetic_edges() {
        let scheduler = BatchScheduler::new(3, 1500);
        assert_eq!(scheduler.batch_count(0), 0);
        assert_eq!(scheduler.delay_count(0), 0);
        assert_eq!(scheduler.batch_count(3), 1);
        assert_eq!(scheduler.delay_count(3), 0);
        assert_eq!(scheduler.batch_count(4), 2);
        assert_eq!(scheduler.delay_count(4), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_applies_between_batches_but_not_after_the_last() {
        let scheduler = BatchScheduler::new(3, 1500);
        let start = tokio::time::Instant::now();

        let results = scheduler
            .run(&symbols(7), |s| async move { Some(s) })
            .await;

        // 3 batches, 2 pauses: exactly 3.0 s of virtual sleep, none trailing.
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
        assert_eq!(results.len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn single_batch_never_sleeps() {
        let scheduler = BatchScheduler::new(3, 1500);
        let start = tokio::time::Instant::now();
        let results = scheduler
            .run(&symbols(3), |s| async move { Some(s) })
            .await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(results.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_symbols_are_filtered_without_aborting() {
        let scheduler = BatchScheduler::new(3, 1500);
        let attempted = Arc::new(AtomicUsize::new(0));

        let counter = attempted.clone();
        let results = scheduler
            .run(&symbols(7), move |s| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    // Every odd symbol fails.
                    let idx: usize = s.trim_start_matches("SYM").parse().unwrap();
                    (idx % 2 == 0).then_some(s)
                }
            })
            .await;

        // All 7 were attempted; only the 4 even ones survive, in order.
        assert_eq!(attempted.load(Ordering::SeqCst), 7);
        assert_eq!(results, vec!["SYM0", "SYM2", "SYM4", "SYM6"]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_watchlist_is_a_no_op() {
        let scheduler = BatchScheduler::new(3, 1500);
        let results: Vec<String> = scheduler.run(&[], |s| async move { Some(s) }).await;
        assert!(results.is_empty());
    }
}
