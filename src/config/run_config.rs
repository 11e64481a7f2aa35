//! Run configuration derived from CLI arguments

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::cli::{CliArgs, QueryType};
use crate::utils::{BenchError, Result};

/// Transport scheme for reaching the target resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    /// Plain DNS over UDP (default when no scheme is given)
    #[default]
    Udp,
    /// Plain DNS over TCP
    Tcp,
    /// DNS-over-TLS
    Tls,
}

impl Scheme {
    /// Well-known port for this transport
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Udp | Scheme::Tcp => 53,
            Scheme::Tls => 853,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Udp => "udp",
            Scheme::Tcp => "tcp",
            Scheme::Tls => "tls",
        }
    }
}

/// Parsed target address: scheme + host + port
#[derive(Debug, Clone)]
pub struct TargetAddress {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl TargetAddress {
    /// Parse a scheme-qualified address string.
    ///
    /// Accepted forms: `9.9.9.9`, `udp://9.9.9.9:53`, `tcp://dns.example`,
    /// `tls://dns.example:853`, `[::1]:53`. A missing port falls back to
    /// the scheme's well-known port. Encrypted schemes that need an HTTP
    /// or QUIC stack (`https`, `quic`, `h3`) are rejected.
    pub fn parse(address: &str) -> Result<Self> {
        let invalid = |reason: &str| BenchError::InvalidAddress {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = match address.split_once("://") {
            Some((s, rest)) => {
                let scheme = match s {
                    "udp" => Scheme::Udp,
                    "tcp" => Scheme::Tcp,
                    "tls" => Scheme::Tls,
                    "https" | "quic" | "h3" => {
                        return Err(BenchError::UnsupportedScheme(s.to_string()));
                    }
                    _ => return Err(invalid("unknown scheme")),
                };
                (scheme, rest)
            }
            None => (Scheme::Udp, address),
        };

        if rest.is_empty() {
            return Err(invalid("empty host"));
        }

        let (host, port) = Self::split_host_port(rest).ok_or_else(|| invalid("malformed port"))?;
        if host.is_empty() {
            return Err(invalid("empty host"));
        }

        Ok(Self {
            scheme,
            host: host.to_string(),
            port: port.unwrap_or_else(|| scheme.default_port()),
        })
    }

    /// Split `host[:port]`, tolerating bracketed IPv6 literals and bare
    /// IPv6 addresses (which contain colons but no port).
    fn split_host_port(s: &str) -> Option<(&str, Option<u16>)> {
        if let Some(inner) = s.strip_prefix('[') {
            // [v6] or [v6]:port
            let (host, after) = inner.split_once(']')?;
            return match after {
                "" => Some((host, None)),
                _ => {
                    let port = after.strip_prefix(':')?.parse().ok()?;
                    Some((host, Some(port)))
                }
            };
        }

        match s.rsplit_once(':') {
            // More than one colon without brackets: a bare IPv6 address.
            Some((head, _)) if head.contains(':') => Some((s, None)),
            Some((host, port)) => {
                let port = port.parse().ok()?;
                Some((host, Some(port)))
            }
            None => Some((s, None)),
        }
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme.as_str(), self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
        }
    }
}

/// Complete run configuration, immutable once built
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Parsed target resolver address
    pub target: TargetAddress,
    /// Number of concurrent worker connections
    pub parallelism: u32,
    /// Query name template; `{random}` is substituted per attempt
    pub query_template: String,
    /// Record type to ask for
    pub query_type: QueryType,
    /// Per-query timeout
    pub timeout: Duration,
    /// Queries per second across all workers (0 = unlimited)
    pub rate_limit: u32,
    /// Total query budget for the run
    pub count: u64,
    /// Skip TLS certificate validation
    pub insecure: bool,
    /// DEBUG-level logging
    pub verbose: bool,
    /// Optional log file destination
    pub log_output: Option<PathBuf>,
}

impl RunConfig {
    /// Build and validate configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        args.validate().map_err(BenchError::Config)?;

        let target = TargetAddress::parse(&args.address)?;

        Ok(Self {
            target,
            parallelism: args.parallel,
            query_template: args.query.clone(),
            query_type: args.query_type,
            timeout: Duration::from_secs(args.timeout_secs),
            rate_limit: args.rate_limit,
            count: args.count,
            insecure: args.insecure,
            verbose: args.verbose,
            log_output: args.log_output.clone(),
        })
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  address:    {}", self.target)?;
        writeln!(f, "  parallel:   {}", self.parallelism)?;
        writeln!(f, "  query:      {} ({})", self.query_template, self.query_type.as_str())?;
        writeln!(f, "  timeout:    {:?}", self.timeout)?;
        writeln!(f, "  rate limit: {}", self.rate_limit)?;
        writeln!(f, "  count:      {}", self.count)?;
        write!(f, "  insecure:   {}", self.insecure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_host() {
        let addr = TargetAddress::parse("9.9.9.9").unwrap();
        assert_eq!(addr.scheme, Scheme::Udp);
        assert_eq!(addr.host, "9.9.9.9");
        assert_eq!(addr.port, 53);
    }

    #[test]
    fn test_parse_scheme_and_port() {
        let addr = TargetAddress::parse("tcp://dns.example:5353").unwrap();
        assert_eq!(addr.scheme, Scheme::Tcp);
        assert_eq!(addr.host, "dns.example");
        assert_eq!(addr.port, 5353);
    }

    #[test]
    fn test_parse_tls_default_port() {
        let addr = TargetAddress::parse("tls://dns.quad9.net").unwrap();
        assert_eq!(addr.scheme, Scheme::Tls);
        assert_eq!(addr.port, 853);
    }

    #[test]
    fn test_parse_ipv6() {
        let addr = TargetAddress::parse("[2620:fe::fe]:53").unwrap();
        assert_eq!(addr.host, "2620:fe::fe");
        assert_eq!(addr.port, 53);

        let addr = TargetAddress::parse("2620:fe::fe").unwrap();
        assert_eq!(addr.host, "2620:fe::fe");
        assert_eq!(addr.port, 53);

        let addr = TargetAddress::parse("tls://[::1]").unwrap();
        assert_eq!(addr.host, "::1");
        assert_eq!(addr.port, 853);
    }

    #[test]
    fn test_parse_rejects_doh_doq() {
        assert!(matches!(
            TargetAddress::parse("https://dns.example/dns-query"),
            Err(BenchError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            TargetAddress::parse("quic://dns.example"),
            Err(BenchError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(TargetAddress::parse("").is_err());
        assert!(TargetAddress::parse("ftp://dns.example").is_err());
        assert!(TargetAddress::parse("dns.example:notaport").is_err());
        assert!(TargetAddress::parse("udp://").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let addr = TargetAddress::parse("tls://dns.quad9.net:853").unwrap();
        assert_eq!(addr.to_string(), "tls://dns.quad9.net:853");

        let addr = TargetAddress::parse("[::1]:53").unwrap();
        assert_eq!(addr.to_string(), "udp://[::1]:53");
    }
}
