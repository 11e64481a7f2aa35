//! Command-line argument parsing
//!
//! Flags mirror the classic DNS benchmarking tools: a target address, a
//! parallelism level, a query-name template, and the global rate/count
//! limits that bound the run.

use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;

/// DNS benchmarking tool: opens parallel connections and measures
/// sustained query throughput against a resolver
#[derive(Parser, Debug, Clone)]
#[command(name = "dnspulse")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// Address of the DNS server to test. For encrypted DNS include the
    /// scheme (tls://); plain UDP needs no scheme
    #[arg(short = 'a', long = "address")]
    pub address: String,

    /// Number of connections to open simultaneously
    #[arg(short = 'p', long = "parallel", default_value_t = 1)]
    pub parallel: u32,

    /// Host name to resolve. {random} is replaced with a random string
    /// on every query
    #[arg(short = 'q', long = "query", default_value = "example.org")]
    pub query: String,

    /// DNS record type to query
    #[arg(long = "type", value_enum, default_value_t = QueryType::A)]
    pub query_type: QueryType,

    /// Query timeout in seconds
    #[arg(short = 't', long = "timeout", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Rate limit in queries per second (0 = unlimited)
    #[arg(short = 'r', long = "rate-limit", default_value_t = 0)]
    pub rate_limit: u32,

    /// Overall number of queries to send
    #[arg(short = 'c', long = "count", default_value_t = 10_000)]
    pub count: u64,

    /// Do not validate the server certificate
    #[arg(long = "insecure")]
    pub insecure: bool,

    /// Verbose output (DEBUG-level log)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Path to the log file. If not set, write to stdout
    #[arg(short = 'o', long = "output")]
    pub log_output: Option<PathBuf>,
}

/// DNS record types supported on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryType {
    #[default]
    #[value(name = "A")]
    A,
    #[value(name = "AAAA")]
    Aaaa,
    #[value(name = "CNAME")]
    Cname,
    #[value(name = "MX")]
    Mx,
    #[value(name = "NS")]
    Ns,
    #[value(name = "TXT")]
    Txt,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::A => "A",
            QueryType::Aaaa => "AAAA",
            QueryType::Cname => "CNAME",
            QueryType::Mx => "MX",
            QueryType::Ns => "NS",
            QueryType::Txt => "TXT",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CliArgs {
    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.parallel == 0 {
            return Err("--parallel must be at least 1".to_string());
        }
        if self.count == 0 {
            return Err("--count must be at least 1".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("--timeout must be at least 1 second".to_string());
        }
        if self.query.trim().is_empty() {
            return Err("--query must not be empty".to_string());
        }
        Ok(())
    }
}
