//! Benchmark engine
//!
//! The multi-threaded run machinery:
//! - RunStats: mutex-guarded shared counters with consistent reporting
//! - RateLimiter: shared token bucket pacing all workers
//! - Worker: one claim/query/record loop per OS thread
//! - BenchRunner: spawns the pool and races completion against Ctrl-C

pub mod rate_limiter;
pub mod runner;
pub mod stats;
pub mod worker;

pub use rate_limiter::RateLimiter;
pub use runner::{BenchRunner, PoolEvent, RunOutcome, RunSummary, WorkerPool};
pub use stats::{RunReport, RunStats};
pub use worker::{Worker, WorkerResult};
