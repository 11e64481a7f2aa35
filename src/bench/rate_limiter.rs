//! Shared rate limiter
//!
//! One token bucket paces every worker, so the configured limit applies
//! to the whole run rather than per connection. Workers sleep outside
//! the lock while waiting for tokens, keeping the critical section to a
//! single refill-and-take.

use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Token bucket: tokens replenish at a steady rate, burst capped at one
/// second's worth
struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    tokens_per_ms: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(qps: u32) -> Self {
        Self {
            tokens: 0.0,
            max_tokens: qps as f64,
            tokens_per_ms: qps as f64 / 1000.0,
            last_update: Instant::now(),
        }
    }

    /// Take one token, or report how long the caller must wait
    fn try_take(&mut self) -> Option<Duration> {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.last_update).as_secs_f64() * 1000.0;
        self.tokens = (self.tokens + elapsed_ms * self.tokens_per_ms).min(self.max_tokens);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            let deficit = 1.0 - self.tokens;
            let wait_ms = deficit / self.tokens_per_ms;
            Some(Duration::from_secs_f64(wait_ms / 1000.0))
        }
    }
}

/// Blocks callers until issuing a query is permitted. Safe for
/// concurrent use from every worker thread.
pub struct RateLimiter {
    bucket: Option<Mutex<TokenBucket>>,
}

impl RateLimiter {
    /// Limiter for the given rate; 0 means unlimited
    pub fn new(qps: u32) -> Self {
        let bucket = if qps > 0 {
            Some(Mutex::new(TokenBucket::new(qps)))
        } else {
            None
        };
        Self { bucket }
    }

    /// Limiter that never blocks
    pub fn unlimited() -> Self {
        Self { bucket: None }
    }

    pub fn is_unlimited(&self) -> bool {
        self.bucket.is_none()
    }

    /// Block the calling thread until a query may be issued
    pub fn acquire(&self) {
        let Some(bucket) = &self.bucket else {
            return;
        };

        loop {
            let wait = bucket.lock().try_take();
            match wait {
                None => return,
                Some(duration) => thread::sleep(duration),
            }
        }
    }
}
