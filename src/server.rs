//! UDP listener and upstream forwarder.
//!
//! Owns both sockets and drives the per-datagram pipeline serially: one
//! query is fully handled, upstream round-trip included, before the next is
//! received. Errors inside the loop are logged and never escape it.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time;
use tracing::{debug, info, warn};

use crate::codec::MAX_EDNS_PAYLOAD;
use crate::error::DnsError;
use crate::resolver::{QueryAction, Resolver};

/// Standard DNS port, used for the upstream when none is given.
pub const DNS_PORT: u16 = 53;

/// A datagram needs the 12-byte header plus at least one byte of question.
const MIN_QUERY_LEN: usize = 13;

/// Listener configuration. Addresses stay as strings so that validation
/// happens in [`Listener::init`] and surfaces [`DnsError::InvalidIp`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Local IPv4 address to bind.
    pub bind_ip: String,
    /// UDP port to listen on.
    pub port: u16,
    /// Upstream resolver: a bare IPv4 address (port 53 implied) or `ip:port`.
    pub upstream: String,
    /// How long to wait for an upstream reply before giving up.
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_ip: "0.0.0.0".to_string(),
            port: DNS_PORT,
            upstream: "8.8.8.8".to_string(),
            timeout_ms: 5000,
        }
    }
}

fn parse_upstream(upstream: &str) -> Result<SocketAddr, DnsError> {
    if upstream.contains(':') {
        match upstream.parse() {
            // IPv4 upstreams only.
            Ok(addr @ SocketAddr::V4(_)) => Ok(addr),
            _ => Err(DnsError::InvalidIp),
        }
    } else {
        let ip: Ipv4Addr = upstream.parse().map_err(|_| DnsError::InvalidIp)?;
        Ok(SocketAddr::V4(SocketAddrV4::new(ip, DNS_PORT)))
    }
}

/// The DNS listener. Unbound until [`init`](Listener::init) succeeds, then
/// [`run`](Listener::run) loops forever.
pub struct Listener {
    socket: Option<UdpSocket>,
    upstream: Option<UdpSocket>,
    upstream_addr: Option<SocketAddr>,
    timeout: Duration,
    resolver: Resolver,
}

impl Listener {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            socket: None,
            upstream: None,
            upstream_addr: None,
            timeout: Duration::from_millis(5000),
            resolver,
        }
    }

    /// Bind the listener socket and set up the upstream socket.
    ///
    /// On failure the listener stays unbound and the caller decides whether
    /// that is fatal (it is, at startup).
    pub async fn init(&mut self, cfg: &Config) -> Result<(), DnsError> {
        let bind_ip: Ipv4Addr = cfg.bind_ip.parse().map_err(|_| DnsError::InvalidIp)?;
        let upstream_addr = parse_upstream(&cfg.upstream)?;

        let socket = match UdpSocket::bind((bind_ip, cfg.port)).await {
            Ok(socket) => socket,
            Err(e) => {
                warn!(ip = %bind_ip, port = cfg.port, error = %e, "listener bind failed");
                return Err(DnsError::ServerBindFail);
            }
        };
        let upstream = match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await {
            Ok(socket) => socket,
            Err(e) => {
                warn!(error = %e, "upstream socket creation failed");
                return Err(DnsError::ServerSocketFail);
            }
        };

        info!(ip = %bind_ip, port = cfg.port, "listener bound");
        info!(upstream = %upstream_addr, "upstream resolver configured");

        self.socket = Some(socket);
        self.upstream = Some(upstream);
        self.upstream_addr = Some(upstream_addr);
        self.timeout = Duration::from_millis(cfg.timeout_ms);
        Ok(())
    }

    /// The address the listener actually bound (port 0 resolves here).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Receive and handle datagrams forever.
    ///
    /// Per-datagram faults are logged and the loop continues; the only way
    /// this returns is being called before a successful `init`.
    pub async fn run(&self) -> Result<(), DnsError> {
        let Some(socket) = &self.socket else {
            return Err(DnsError::ServerNotRunning);
        };

        info!(
            blocked_domains = self.resolver.blocked_count(),
            "listener running, waiting for queries"
        );

        let mut buf = [0u8; MAX_EDNS_PAYLOAD];
        loop {
            let (len, client) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!(error = %e, "{}", DnsError::ServerRecvFail);
                    continue;
                }
            };
            if len < MIN_QUERY_LEN {
                warn!(len, client = %client, "{}", DnsError::ParseTooShort);
                continue;
            }

            let query = &buf[..len];
            match self.resolver.process_query(query) {
                QueryAction::Blocked { response, domain } => {
                    if response.len() > MAX_EDNS_PAYLOAD {
                        warn!(
                            domain = %domain,
                            len = response.len(),
                            "blocked response exceeds max payload, dropping ({})",
                            DnsError::ServerSendFail
                        );
                        continue;
                    }
                    match socket.send_to(&response, client).await {
                        Ok(sent) => {
                            info!(client = %client, domain = %domain, bytes = sent, "blocked");
                        }
                        Err(e) => {
                            warn!(domain = %domain, error = %e, "{}", DnsError::ServerSendFail);
                        }
                    }
                }
                QueryAction::Forward { domain, qtype } => {
                    info!(client = %client, domain = %domain, qtype, "forwarding query");
                    if let Err(e) = self.forward(query, client).await {
                        warn!(domain = %domain, error = %e, "forward failed");
                    }
                }
                QueryAction::Ignore => {
                    debug!(client = %client, "datagram with no questions, ignoring");
                }
                QueryAction::Invalid(e) => {
                    warn!(client = %client, error = %e, "dropping datagram");
                }
            }
        }
    }

    /// Relay one raw query upstream and pipe the reply back to the client.
    ///
    /// The reply is not parsed or rewritten; the client's transaction id is
    /// already inside the forwarded bytes.
    async fn forward(&self, query: &[u8], client: SocketAddr) -> Result<(), DnsError> {
        let (Some(socket), Some(upstream), Some(upstream_addr)) =
            (&self.socket, &self.upstream, self.upstream_addr)
        else {
            return Err(DnsError::UpstreamUnreachable);
        };

        if let Err(e) = upstream.send_to(query, upstream_addr).await {
            warn!(upstream = %upstream_addr, error = %e, "upstream send failed");
            return Err(DnsError::UpstreamUnreachable);
        }
        debug!(upstream = %upstream_addr, "query sent upstream");

        let mut buf = [0u8; MAX_EDNS_PAYLOAD];
        let (len, _from) = match time::timeout(self.timeout, upstream.recv_from(&mut buf)).await {
            Err(_) => return Err(DnsError::UpstreamTimeout),
            Ok(Err(e)) => {
                warn!(upstream = %upstream_addr, error = %e, "upstream recv failed");
                return Err(DnsError::UpstreamUnreachable);
            }
            Ok(Ok(received)) => received,
        };
        debug!(upstream = %upstream_addr, bytes = len, "relaying upstream reply");

        match socket.send_to(&buf[..len], client).await {
            Ok(_) => Ok(()),
            // A reset here is the OS surfacing an ICMP Port Unreachable from
            // an earlier send; the datagram is gone either way.
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => Ok(()),
            Err(e) => {
                warn!(client = %client, error = %e, "client send failed");
                Err(DnsError::ServerSendFail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Blocklist;

    fn empty_resolver() -> Resolver {
        Resolver::new(Blocklist::from_iter(std::iter::empty::<String>()))
    }

    #[tokio::test]
    async fn run_before_init_is_not_running() {
        let listener = Listener::new(empty_resolver());

        assert_eq!(listener.run().await, Err(DnsError::ServerNotRunning));
    }

    #[tokio::test]
    async fn init_rejects_bad_bind_ip() {
        let mut listener = Listener::new(empty_resolver());
        let cfg = Config {
            bind_ip: "not-an-ip".to_string(),
            ..Config::default()
        };

        assert_eq!(listener.init(&cfg).await, Err(DnsError::InvalidIp));
        assert!(listener.local_addr().is_none());
    }

    #[tokio::test]
    async fn init_rejects_bad_upstream() {
        let mut listener = Listener::new(empty_resolver());
        let cfg = Config {
            bind_ip: "127.0.0.1".to_string(),
            port: 0,
            upstream: "8.8.8.8.8".to_string(),
            ..Config::default()
        };

        assert_eq!(listener.init(&cfg).await, Err(DnsError::InvalidIp));
    }

    #[tokio::test]
    async fn init_binds_ephemeral_port() {
        let mut listener = Listener::new(empty_resolver());
        let cfg = Config {
            bind_ip: "127.0.0.1".to_string(),
            port: 0,
            ..Config::default()
        };

        listener.init(&cfg).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.port() != 0);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn upstream_accepts_bare_ip_and_socket_addr() {
        assert_eq!(
            parse_upstream("8.8.8.8").unwrap(),
            "8.8.8.8:53".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_upstream("127.0.0.1:5353").unwrap(),
            "127.0.0.1:5353".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(parse_upstream("nonsense"), Err(DnsError::InvalidIp));
        assert_eq!(parse_upstream("::1"), Err(DnsError::InvalidIp));
        assert_eq!(parse_upstream("[::1]:53"), Err(DnsError::InvalidIp));
    }
}
