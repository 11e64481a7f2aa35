//! Run orchestration
//!
//! Spawns the worker pool, supervises completion, and races it against
//! an operator interrupt. Shutdown on interrupt is best-effort: workers
//! stop at their next loop iteration, in-flight queries are neither
//! cancelled nor drained, and the final report covers whatever was
//! recorded up to that point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use hdrhistogram::Histogram;
use tracing::info;

use crate::client::ClientFactory;
use crate::config::RunConfig;
use crate::utils::{BenchError, Result};

use super::rate_limiter::RateLimiter;
use super::stats::{RunReport, RunStats};
use super::worker::{Worker, WorkerResult};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// All workers drained the budget and exited
    Completed,
    /// An operator interrupt cut the run short
    Interrupted,
}

/// Event delivered to the orchestrator, whichever source fires first
pub enum PoolEvent {
    Completed(Vec<WorkerResult>),
    Interrupted,
}

/// A spawned set of worker threads
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerResult>>,
}

impl WorkerPool {
    /// Spawn exactly `parallelism` workers sharing the given stats,
    /// limiter, and shutdown flag
    pub fn spawn<F>(
        factory: F,
        parallelism: u32,
        template: &str,
        stats: &Arc<RunStats>,
        limiter: &Arc<RateLimiter>,
        shutdown: &Arc<AtomicBool>,
    ) -> Self
    where
        F: ClientFactory + Clone + Send + 'static,
        F::Client: Send + 'static,
    {
        let mut handles = Vec::with_capacity(parallelism as usize);

        for worker_id in 0..parallelism as usize {
            let worker = Worker::new(worker_id, factory.clone(), template);
            let stats = Arc::clone(stats);
            let limiter = Arc::clone(limiter);
            let shutdown = Arc::clone(shutdown);

            let handle = thread::Builder::new()
                .name(format!("worker-{worker_id}"))
                .spawn(move || worker.run(stats, limiter, shutdown))
                .expect("Failed to spawn worker thread");

            handles.push(handle);
        }

        Self { handles }
    }

    /// Wait for every worker to finish
    pub fn join(self) -> Vec<WorkerResult> {
        self.handles
            .into_iter()
            .map(|h| h.join().expect("Worker thread panicked"))
            .collect()
    }
}

/// Final run summary handed back to the binary
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub report: RunReport,
    /// Merged worker latency histogram (microseconds). Absent when the
    /// run was interrupted, since workers were not joined.
    pub latency: Option<Histogram<u64>>,
}

impl RunSummary {
    /// Emit the final result lines through the logging sink
    pub fn log(&self) {
        info!("The test results are:");
        info!("Elapsed: {:?}", self.report.elapsed);
        info!("Average QPS: {:.2}", self.report.total_qps);
        info!("Processed queries: {}", self.report.processed);
        match self.report.avg_per_query {
            Some(avg) => info!("Average per query: {:?}", avg),
            None => info!("Average per query: n/a (no queries succeeded)"),
        }
        info!("Errors count: {}", self.report.errors);

        if let Some(histogram) = &self.latency {
            if histogram.len() > 0 {
                info!(
                    "Latency (ms): p50={:.2} p95={:.2} p99={:.2} max={:.2}",
                    histogram.value_at_percentile(50.0) as f64 / 1000.0,
                    histogram.value_at_percentile(95.0) as f64 / 1000.0,
                    histogram.value_at_percentile(99.0) as f64 / 1000.0,
                    histogram.max() as f64 / 1000.0,
                );
            }
        }
    }
}

/// Orchestrates one benchmark run
pub struct BenchRunner {
    config: RunConfig,
}

impl BenchRunner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Run the benchmark to completion or interruption.
    ///
    /// Installs a Ctrl-C handler, so this may be called at most once
    /// per process.
    pub fn run<F>(&self, factory: F) -> Result<RunSummary>
    where
        F: ClientFactory + Clone + Send + 'static,
        F::Client: Send + 'static,
    {
        let stats = Arc::new(RunStats::new(self.config.count));
        let limiter = Arc::new(RateLimiter::new(self.config.rate_limit));
        let shutdown = Arc::new(AtomicBool::new(false));

        let (tx, rx) = mpsc::channel();

        let interrupt_tx = tx.clone();
        ctrlc::set_handler(move || {
            interrupt_tx.send(PoolEvent::Interrupted).ok();
        })
        .map_err(|e| BenchError::Config(format!("cannot install interrupt handler: {e}")))?;

        let parallelism = self.config.parallelism;
        let template = self.config.query_template.clone();
        {
            let stats = Arc::clone(&stats);
            let limiter = Arc::clone(&limiter);
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("supervisor".to_string())
                .spawn(move || {
                    info!(
                        "Starting the test and running {} connections in parallel",
                        parallelism
                    );
                    let pool =
                        WorkerPool::spawn(factory, parallelism, &template, &stats, &limiter, &shutdown);
                    let results = pool.join();
                    info!("Finished running all connections");
                    tx.send(PoolEvent::Completed(results)).ok();
                })
                .expect("Failed to spawn supervisor thread");
        }

        // Both senders live in long-lived closures, so recv only fails
        // if the process is already tearing down.
        let event = rx.recv().unwrap_or(PoolEvent::Interrupted);
        let (outcome, latency) = match event {
            PoolEvent::Completed(results) => {
                info!("The test has finished.");
                (RunOutcome::Completed, Some(merge_histograms(&results)))
            }
            PoolEvent::Interrupted => {
                info!("The test has been interrupted.");
                // Workers exit at the top of their next iteration; they
                // are not joined and in-flight queries are left alone.
                shutdown.store(true, Ordering::SeqCst);
                (RunOutcome::Interrupted, None)
            }
        };

        Ok(RunSummary {
            outcome,
            report: stats.final_report(),
            latency,
        })
    }
}

fn merge_histograms(results: &[WorkerResult]) -> Histogram<u64> {
    let mut merged =
        Histogram::new_with_bounds(1, 3_600_000_000, 3).expect("Failed to create histogram");
    for result in results {
        merged.add(&result.histogram).ok();
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DnsClient;
    use crate::utils::QueryError;

    #[derive(Clone)]
    struct OkFactory;

    struct OkClient;

    impl DnsClient for OkClient {
        fn resolve(&mut self, _name: &str) -> std::result::Result<(), QueryError> {
            Ok(())
        }
    }

    impl ClientFactory for OkFactory {
        type Client = OkClient;

        fn create(&self) -> std::result::Result<OkClient, QueryError> {
            Ok(OkClient)
        }
    }

    #[test]
    fn test_pool_drains_budget_across_workers() {
        let stats = Arc::new(RunStats::new(200));
        let limiter = Arc::new(RateLimiter::unlimited());
        let shutdown = Arc::new(AtomicBool::new(false));

        let pool = WorkerPool::spawn(OkFactory, 4, "example.org", &stats, &limiter, &shutdown);
        let results = pool.join();

        assert_eq!(results.len(), 4);
        let total: u64 = results.iter().map(|r| r.processed + r.errors).sum();
        assert_eq!(total, 200);

        let (processed, errors) = stats.progress();
        assert_eq!(processed, 200);
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_merge_histograms() {
        let mut a = Histogram::new_with_bounds(1, 3_600_000_000, 3).unwrap();
        a.record(100).unwrap();
        let mut b = Histogram::new_with_bounds(1, 3_600_000_000, 3).unwrap();
        b.record(300).unwrap();

        let results = vec![
            WorkerResult { worker_id: 0, histogram: a, processed: 1, errors: 0 },
            WorkerResult { worker_id: 1, histogram: b, processed: 1, errors: 0 },
        ];

        let merged = merge_histograms(&results);
        assert_eq!(merged.len(), 2);
        assert!(merged.max() >= 300);
    }
}
