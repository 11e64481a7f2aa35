//! DNS query client built on hickory-proto
//!
//! A client performs one request/response exchange per `resolve` call.
//! Success means a well-formed DNS response with a matching message id
//! arrived within the timeout; response contents are not validated.

use std::time::Duration;

use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};

use crate::config::{QueryType, RunConfig, TargetAddress};
use crate::utils::QueryError;

use super::transport::Transport;

/// One name-resolution exchange against the configured target
pub trait DnsClient {
    fn resolve(&mut self, name: &str) -> Result<(), QueryError>;
}

/// Builds clients; workers call this again after every failure to
/// replace a possibly-broken connection
pub trait ClientFactory {
    type Client: DnsClient;

    fn create(&self) -> Result<Self::Client, QueryError>;
}

/// Factory for real upstream clients
#[derive(Debug, Clone)]
pub struct UpstreamFactory {
    target: TargetAddress,
    timeout: Duration,
    insecure: bool,
    record_type: RecordType,
}

impl UpstreamFactory {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            target: config.target.clone(),
            timeout: config.timeout,
            insecure: config.insecure,
            record_type: record_type_for(config.query_type),
        }
    }
}

impl ClientFactory for UpstreamFactory {
    type Client = UpstreamClient;

    fn create(&self) -> Result<UpstreamClient, QueryError> {
        let transport = Transport::connect(&self.target, self.timeout, self.insecure)?;
        Ok(UpstreamClient {
            transport,
            record_type: self.record_type,
            rng: fastrand::Rng::new(),
        })
    }
}

/// Client holding one exclusive transport connection
pub struct UpstreamClient {
    transport: Transport,
    record_type: RecordType,
    rng: fastrand::Rng,
}

impl UpstreamClient {
    /// Encode a query for `name`, returning the message id for matching
    /// against the response
    fn build_query(&mut self, name: &str) -> Result<(u16, Vec<u8>), QueryError> {
        let mut fqdn = Name::from_utf8(name)
            .map_err(|e| QueryError::Protocol(format!("invalid query name '{name}': {e}")))?;
        fqdn.set_fqdn(true);

        let id = self.rng.u16(..);
        let mut message = Message::new();
        message.set_id(id);
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(Query::query(fqdn, self.record_type));

        let payload = message
            .to_vec()
            .map_err(|e| QueryError::Protocol(format!("failed to encode query: {e}")))?;
        Ok((id, payload))
    }
}

impl DnsClient for UpstreamClient {
    fn resolve(&mut self, name: &str) -> Result<(), QueryError> {
        let (id, payload) = self.build_query(name)?;
        let raw = self.transport.exchange(&payload)?;

        let response = Message::from_vec(&raw)
            .map_err(|e| QueryError::Protocol(format!("failed to decode response: {e}")))?;

        if response.id() != id {
            return Err(QueryError::Protocol(format!(
                "response id {} does not match query id {}",
                response.id(),
                id
            )));
        }
        if response.message_type() != MessageType::Response {
            return Err(QueryError::Protocol("expected a response message".to_string()));
        }

        // Any response counts, including NXDOMAIN and SERVFAIL: the
        // exchange completed and content verification is out of scope.
        Ok(())
    }
}

fn record_type_for(query_type: QueryType) -> RecordType {
    match query_type {
        QueryType::A => RecordType::A,
        QueryType::Aaaa => RecordType::AAAA,
        QueryType::Cname => RecordType::CNAME,
        QueryType::Mx => RecordType::MX,
        QueryType::Ns => RecordType::NS,
        QueryType::Txt => RecordType::TXT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;
    use std::thread;

    use crate::config::Scheme;

    fn factory_for(addr: &str, port: u16) -> UpstreamFactory {
        UpstreamFactory {
            target: TargetAddress {
                scheme: Scheme::Udp,
                host: addr.to_string(),
                port,
            },
            timeout: Duration::from_secs(2),
            insecure: false,
            record_type: RecordType::A,
        }
    }

    /// Minimal UDP echo resolver: parses the query and answers with an
    /// empty NOERROR response carrying the same id.
    fn spawn_stub_resolver(responses: usize) -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind stub resolver");
        let port = socket.local_addr().expect("local addr").port();

        thread::spawn(move || {
            let mut buf = [0u8; 512];
            for _ in 0..responses {
                let Ok((n, peer)) = socket.recv_from(&mut buf) else {
                    return;
                };
                let Ok(query) = Message::from_vec(&buf[..n]) else {
                    continue;
                };
                let mut reply = Message::new();
                reply.set_id(query.id());
                reply.set_message_type(MessageType::Response);
                reply.set_op_code(OpCode::Query);
                reply.set_recursion_desired(true);
                reply.set_recursion_available(true);
                for q in query.queries() {
                    reply.add_query(q.clone());
                }
                let payload = reply.to_vec().expect("encode reply");
                socket.send_to(&payload, peer).ok();
            }
        });

        port
    }

    #[test]
    fn test_udp_resolve_roundtrip() {
        let port = spawn_stub_resolver(2);
        let factory = factory_for("127.0.0.1", port);

        let mut client = factory.create().expect("create client");
        client.resolve("example.org").expect("first resolve");
        client.resolve("example.org").expect("second resolve");
    }

    #[test]
    fn test_udp_resolve_timeout() {
        // Bind a socket that never answers
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind silent socket");
        let port = socket.local_addr().expect("local addr").port();

        let factory = UpstreamFactory {
            timeout: Duration::from_millis(100),
            ..factory_for("127.0.0.1", port)
        };

        let mut client = factory.create().expect("create client");
        let result = client.resolve("example.org");
        assert!(matches!(result, Err(QueryError::Timeout(_))));
    }

    #[test]
    fn test_build_query_rejects_bad_name() {
        let port = spawn_stub_resolver(0);
        let factory = factory_for("127.0.0.1", port);
        let mut client = factory.create().expect("create client");

        let overlong_label = format!("{}.example.org", "a".repeat(80));
        assert!(matches!(
            client.resolve(&overlong_label),
            Err(QueryError::Protocol(_))
        ));
    }
}
