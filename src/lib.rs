//! dnspulse library
//!
//! Concurrent DNS benchmark engine: worker pool, shared rate limiter,
//! run statistics, and the query client used to exchange requests with
//! the target resolver.

pub mod bench;
pub mod client;
pub mod config;
pub mod utils;
