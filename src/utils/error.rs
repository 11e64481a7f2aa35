//! Error types for dnspulse

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Setup-level errors. Any of these aborts the run before workers start.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Invalid server address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Unsupported transport scheme '{0}://' (supported: udp, tcp, tls)")]
    UnsupportedScheme(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Per-query errors. These are absorbed into the error counter and
/// never propagated past the worker loop.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("TLS error: {0}")]
    Tls(String),
}

impl QueryError {
    /// Classify an IO error from a socket operation that was bounded by
    /// `timeout`. Timed-out reads surface as `WouldBlock` on some
    /// platforms and `TimedOut` on others.
    pub fn from_io(err: io::Error, timeout: Duration) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => QueryError::Timeout(timeout),
            _ => QueryError::Connection(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_classification() {
        let timeout = Duration::from_secs(3);

        let e = io::Error::new(io::ErrorKind::TimedOut, "read timed out");
        assert!(matches!(
            QueryError::from_io(e, timeout),
            QueryError::Timeout(t) if t == timeout
        ));

        let e = io::Error::new(io::ErrorKind::WouldBlock, "would block");
        assert!(matches!(
            QueryError::from_io(e, timeout),
            QueryError::Timeout(_)
        ));

        let e = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            QueryError::from_io(e, timeout),
            QueryError::Connection(_)
        ));
    }
}
