//! Shared run statistics
//!
//! One instance is shared by every worker. All fields live behind a
//! single mutex so a progress report always sees a consistent snapshot:
//! the counter increment and the report check happen in the same lock
//! scope, which keeps two workers from computing overlapping intervals.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::info;

/// Emit an intermediate progress line every this many outcomes
const REPORT_EVERY: u64 = 100;

#[derive(Debug)]
struct StatsInner {
    /// Successful exchanges
    processed: u64,
    /// Failed exchanges
    errors: u64,
    /// Budget units not yet claimed by any worker
    remaining: u64,
    /// Snapshot at the last progress report, for interval QPS
    last_report_at: Option<Instant>,
    last_report_processed: u64,
    last_report_errors: u64,
}

/// Process-wide counters shared by all workers
pub struct RunStats {
    start: Instant,
    inner: Mutex<StatsInner>,
}

/// Final figures computed once at shutdown
#[derive(Debug, Clone)]
pub struct RunReport {
    pub elapsed: Duration,
    /// Lifetime average over processed + errors
    pub total_qps: f64,
    pub processed: u64,
    pub errors: u64,
    /// Wall time divided by processed count; None when nothing succeeded
    pub avg_per_query: Option<Duration>,
}

impl RunStats {
    /// Create stats for a run with the given query budget
    pub fn new(budget: u64) -> Self {
        Self {
            start: Instant::now(),
            inner: Mutex::new(StatsInner {
                processed: 0,
                errors: 0,
                remaining: budget,
                last_report_at: None,
                last_report_processed: 0,
                last_report_errors: 0,
            }),
        }
    }

    /// Reserve one budget unit for the caller. Returns false when the
    /// budget is exhausted, which tells the worker to stop.
    pub fn claim_next(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.remaining == 0 {
            return false;
        }
        inner.remaining -= 1;
        true
    }

    /// Record one successful exchange
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.processed += 1;
        self.maybe_report(&mut inner);
    }

    /// Record one failed exchange
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.errors += 1;
        self.maybe_report(&mut inner);
    }

    /// Current (processed, errors) pair
    pub fn progress(&self) -> (u64, u64) {
        let inner = self.inner.lock();
        (inner.processed, inner.errors)
    }

    /// Print the intermediate state on every REPORT_EVERY'th outcome.
    /// Must be called with the lock already held.
    fn maybe_report(&self, inner: &mut StatsInner) {
        let since_last =
            inner.processed + inner.errors - inner.last_report_processed - inner.last_report_errors;
        if since_last == 0 || since_last % REPORT_EVERY != 0 {
            return;
        }

        let now = Instant::now();
        let window_start = inner.last_report_at.unwrap_or(self.start);
        let secs = now.duration_since(window_start).as_secs_f64();
        let qps = if secs > 0.0 { since_last as f64 / secs } else { 0.0 };

        info!("Processed {} queries, errors: {}", inner.processed, inner.errors);
        info!("Queries per second: {:.2}", qps);

        inner.last_report_at = Some(now);
        inner.last_report_processed = inner.processed;
        inner.last_report_errors = inner.errors;
    }

    /// Compute the final report. Called once after the pool finishes or
    /// the run is interrupted.
    pub fn final_report(&self) -> RunReport {
        let inner = self.inner.lock();
        let elapsed = self.start.elapsed();
        let total = inner.processed + inner.errors;

        let secs = elapsed.as_secs_f64();
        let total_qps = if secs > 0.0 { total as f64 / secs } else { 0.0 };

        let avg_per_query = if inner.processed > 0 {
            Some(Duration::from_secs_f64(secs / inner.processed as f64))
        } else {
            None
        };

        RunReport {
            elapsed,
            total_qps,
            processed: inner.processed,
            errors: inner.errors,
            avg_per_query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_claim_until_exhausted() {
        let stats = RunStats::new(3);
        assert!(stats.claim_next());
        assert!(stats.claim_next());
        assert!(stats.claim_next());
        assert!(!stats.claim_next());
        // Stays exhausted
        assert!(!stats.claim_next());
    }

    #[test]
    fn test_concurrent_claims_are_exact() {
        let budget = 1000u64;
        let stats = Arc::new(RunStats::new(budget));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    let mut claimed = 0u64;
                    while stats.claim_next() {
                        claimed += 1;
                    }
                    claimed
                })
            })
            .collect();

        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, budget);
    }

    #[test]
    fn test_progress_counts_outcomes() {
        let stats = RunStats::new(10);
        stats.record_success();
        stats.record_success();
        stats.record_failure();

        let (processed, errors) = stats.progress();
        assert_eq!(processed, 2);
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_final_report_totals() {
        let stats = RunStats::new(10);
        for _ in 0..7 {
            stats.record_success();
        }
        for _ in 0..3 {
            stats.record_failure();
        }

        let report = stats.final_report();
        assert_eq!(report.processed, 7);
        assert_eq!(report.errors, 3);
        assert!(report.total_qps > 0.0);
        assert!(report.avg_per_query.is_some());
    }

    #[test]
    fn test_final_report_no_successes() {
        let stats = RunStats::new(5);
        stats.record_failure();

        let report = stats.final_report();
        assert_eq!(report.processed, 0);
        assert_eq!(report.errors, 1);
        assert!(report.avg_per_query.is_none());
    }
}
