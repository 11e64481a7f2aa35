//! Blocking DNS transports: UDP, TCP, and DNS-over-TLS
//!
//! One transport instance backs one worker connection. TCP and TLS
//! streams are persistent and framed with the standard two-byte length
//! prefix; UDP uses a connected socket so stray datagrams from other
//! peers are filtered by the kernel.

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::config::{Scheme, TargetAddress};
use crate::utils::QueryError;

/// Largest response we accept over UDP. Without EDNS the practical
/// limit is 512 bytes, but resolvers behind some middleboxes send more.
const UDP_BUF_SIZE: usize = 4096;

enum Stream {
    Udp(UdpSocket),
    Tcp(TcpStream),
    #[cfg(feature = "native-tls-backend")]
    Tls(Box<native_tls::TlsStream<TcpStream>>),
}

/// A connected transport bound to one target resolver
pub struct Transport {
    stream: Stream,
    timeout: Duration,
}

impl Transport {
    /// Connect to the target using its configured scheme. The timeout
    /// bounds the connect phase and every subsequent exchange.
    pub fn connect(
        target: &TargetAddress,
        timeout: Duration,
        insecure: bool,
    ) -> Result<Self, QueryError> {
        let addr = resolve_addr(&target.host, target.port)?;

        let stream = match target.scheme {
            Scheme::Udp => {
                let bind_addr: SocketAddr = if addr.is_ipv6() {
                    (Ipv6Addr::UNSPECIFIED, 0).into()
                } else {
                    (Ipv4Addr::UNSPECIFIED, 0).into()
                };
                let socket = UdpSocket::bind(bind_addr)?;
                socket.connect(addr)?;
                socket.set_read_timeout(Some(timeout))?;
                socket.set_write_timeout(Some(timeout))?;
                Stream::Udp(socket)
            }
            Scheme::Tcp => Stream::Tcp(connect_tcp(addr, timeout)?),
            #[cfg(feature = "native-tls-backend")]
            Scheme::Tls => {
                let tcp = connect_tcp(addr, timeout)?;
                Stream::Tls(Box::new(tls_handshake(&target.host, tcp, insecure)?))
            }
            #[cfg(not(feature = "native-tls-backend"))]
            Scheme::Tls => {
                let _ = insecure;
                return Err(QueryError::Tls("TLS support not compiled in".to_string()));
            }
        };

        Ok(Self { stream, timeout })
    }

    /// Send one DNS request payload and read one response
    pub fn exchange(&mut self, payload: &[u8]) -> Result<Vec<u8>, QueryError> {
        let timeout = self.timeout;
        match &mut self.stream {
            Stream::Udp(socket) => {
                socket.send(payload).map_err(|e| QueryError::from_io(e, timeout))?;
                let mut buf = vec![0u8; UDP_BUF_SIZE];
                let n = socket.recv(&mut buf).map_err(|e| QueryError::from_io(e, timeout))?;
                buf.truncate(n);
                Ok(buf)
            }
            Stream::Tcp(stream) => exchange_framed(stream, payload, timeout),
            #[cfg(feature = "native-tls-backend")]
            Stream::Tls(stream) => exchange_framed(stream.as_mut(), payload, timeout),
        }
    }
}

fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr, QueryError> {
    (host, port)
        .to_socket_addrs()
        .map_err(QueryError::Connection)?
        .next()
        .ok_or_else(|| {
            QueryError::Connection(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses found for {host}"),
            ))
        })
}

fn connect_tcp(addr: SocketAddr, timeout: Duration) -> Result<TcpStream, QueryError> {
    let stream =
        TcpStream::connect_timeout(&addr, timeout).map_err(|e| QueryError::from_io(e, timeout))?;
    stream.set_nodelay(true).ok();
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    Ok(stream)
}

#[cfg(feature = "native-tls-backend")]
fn tls_handshake(
    host: &str,
    tcp: TcpStream,
    insecure: bool,
) -> Result<native_tls::TlsStream<TcpStream>, QueryError> {
    let mut builder = native_tls::TlsConnector::builder();
    if insecure {
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    }
    let connector = builder
        .build()
        .map_err(|e| QueryError::Tls(format!("failed to build TLS connector: {e}")))?;

    connector
        .connect(host, tcp)
        .map_err(|e| QueryError::Tls(format!("TLS handshake failed: {e}")))
}

/// Exchange over a stream transport with the RFC 1035 two-byte length
/// prefix on both the request and the response.
fn exchange_framed<S: Read + Write>(
    stream: &mut S,
    payload: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, QueryError> {
    if payload.len() > u16::MAX as usize {
        return Err(QueryError::Protocol(format!(
            "request too large for stream framing: {} bytes",
            payload.len()
        )));
    }

    let len = (payload.len() as u16).to_be_bytes();
    stream.write_all(&len).map_err(|e| QueryError::from_io(e, timeout))?;
    stream.write_all(payload).map_err(|e| QueryError::from_io(e, timeout))?;
    stream.flush().map_err(|e| QueryError::from_io(e, timeout))?;

    let mut len_buf = [0u8; 2];
    stream
        .read_exact(&mut len_buf)
        .map_err(|e| QueryError::from_io(e, timeout))?;
    let response_len = u16::from_be_bytes(len_buf) as usize;

    let mut response = vec![0u8; response_len];
    stream
        .read_exact(&mut response)
        .map_err(|e| QueryError::from_io(e, timeout))?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// In-memory stream that replays a canned response and captures writes
    struct FakeStream {
        written: Vec<u8>,
        response: Cursor<Vec<u8>>,
    }

    impl Read for FakeStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.response.read(buf)
        }
    }

    impl Write for FakeStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_framed_exchange() {
        let canned = {
            let body = b"response".to_vec();
            let mut framed = (body.len() as u16).to_be_bytes().to_vec();
            framed.extend_from_slice(&body);
            framed
        };
        let mut stream = FakeStream {
            written: Vec::new(),
            response: Cursor::new(canned),
        };

        let reply = exchange_framed(&mut stream, b"request", Duration::from_secs(1)).unwrap();
        assert_eq!(reply, b"response");
        // 2-byte prefix then the payload
        assert_eq!(&stream.written[..2], &7u16.to_be_bytes());
        assert_eq!(&stream.written[2..], b"request");
    }

    #[test]
    fn test_framed_exchange_truncated_response() {
        // Length prefix promises 16 bytes but only 4 follow
        let mut canned = 16u16.to_be_bytes().to_vec();
        canned.extend_from_slice(b"oops");
        let mut stream = FakeStream {
            written: Vec::new(),
            response: Cursor::new(canned),
        };

        let result = exchange_framed(&mut stream, b"request", Duration::from_secs(1));
        assert!(matches!(result, Err(QueryError::Connection(_))));
    }
}
