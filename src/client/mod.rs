//! Query client: DNS message exchange against the target resolver
//!
//! Each worker owns its client exclusively. After any failure the worker
//! discards the client and asks the factory for a fresh one, since the
//! underlying connection may be in a broken or indeterminate state.

pub mod query_client;
pub mod transport;

pub use query_client::{ClientFactory, DnsClient, UpstreamClient, UpstreamFactory};
pub use transport::Transport;
