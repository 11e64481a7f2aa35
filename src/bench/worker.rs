//! Benchmark worker
//!
//! Each worker owns its client exclusively and runs a claim → query →
//! record loop on a dedicated OS thread. The only shared state is the
//! run statistics and the rate limiter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use hdrhistogram::Histogram;
use tracing::debug;

use crate::client::{ClientFactory, DnsClient};

use super::rate_limiter::RateLimiter;
use super::stats::RunStats;

/// Length of the random string substituted for {random} in query names
const RANDOM_LEN: usize = 16;

/// Placeholder token recognized in query-name templates
const RANDOM_PLACEHOLDER: &str = "{random}";

/// Per-worker outcome returned to the pool when the loop stops
pub struct WorkerResult {
    pub worker_id: usize,
    /// Latencies of successful exchanges, in microseconds
    pub histogram: Histogram<u64>,
    pub processed: u64,
    pub errors: u64,
}

/// One concurrently-running query loop
pub struct Worker<F: ClientFactory> {
    id: usize,
    factory: F,
    client: Option<F::Client>,
    template: String,
    randomize: bool,
    rng: fastrand::Rng,
    histogram: Histogram<u64>,
}

impl<F: ClientFactory> Worker<F> {
    pub fn new(id: usize, factory: F, template: &str) -> Self {
        // 1us to 1 hour, 3 significant digits
        let histogram =
            Histogram::new_with_bounds(1, 3_600_000_000, 3).expect("Failed to create histogram");

        Self {
            id,
            factory,
            client: None,
            template: template.to_string(),
            randomize: template.contains(RANDOM_PLACEHOLDER),
            rng: fastrand::Rng::new(),
            histogram,
        }
    }

    /// Next query name from the template
    fn next_name(&mut self) -> String {
        if !self.randomize {
            return self.template.clone();
        }

        let token: String = (0..RANDOM_LEN).map(|_| self.rng.lowercase()).collect();
        self.template.replace(RANDOM_PLACEHOLDER, &token)
    }

    /// Main worker loop. Claims budget units until the budget runs out
    /// or shutdown is signaled, issuing one query per claim. A claimed
    /// query that fails is never retried; its slot is not refunded.
    pub fn run(
        mut self,
        stats: Arc<RunStats>,
        limiter: Arc<RateLimiter>,
        shutdown: Arc<AtomicBool>,
    ) -> WorkerResult {
        let mut processed = 0u64;
        let mut errors = 0u64;

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            if !stats.claim_next() {
                break;
            }

            let name = self.next_name();
            limiter.acquire();

            // Build a fresh client if the previous one was discarded
            // after a failure (or none exists yet).
            if self.client.is_none() {
                match self.factory.create() {
                    Ok(client) => self.client = Some(client),
                    Err(e) => {
                        debug!("worker {}: failed to create client: {}", self.id, e);
                        stats.record_failure();
                        errors += 1;
                        continue;
                    }
                }
            }
            let Some(client) = self.client.as_mut() else {
                continue;
            };

            let started = Instant::now();
            match client.resolve(&name) {
                Ok(()) => {
                    let latency_us = started.elapsed().as_micros() as u64;
                    self.histogram.record(latency_us).ok();
                    stats.record_success();
                    processed += 1;
                }
                Err(e) => {
                    debug!("worker {}: error occurred: {}", self.id, e);
                    stats.record_failure();
                    errors += 1;
                    // The connection may be broken or mid-response;
                    // drop it and reconnect before the next claim.
                    self.client = None;
                }
            }
        }

        WorkerResult {
            worker_id: self.id,
            histogram: self.histogram,
            processed,
            errors,
        }
    }
}
