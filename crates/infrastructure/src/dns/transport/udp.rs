use ferrous_resolver_domain::DomainError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;

/// Maximum UDP DNS response size with EDNS(0)
pub const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// One unconnected UDP socket talking to a single upstream.
///
/// Sending and receiving are decoupled: queries go out through [`send`]
/// and answers are read by whoever owns the receive loop.
///
/// [`send`]: UdpChannel::send
pub struct UdpChannel {
    socket: UdpSocket,
    server_addr: SocketAddr,
}

impl UdpChannel {
    pub async fn bind(server_addr: SocketAddr) -> Result<Self, DomainError> {
        let local: SocketAddr = match server_addr.ip() {
            IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(local).await.map_err(|e| {
            DomainError::Transport(format!("Failed to bind UDP socket for {}: {}", server_addr, e))
        })?;

        debug!(
            server = %server_addr,
            local = ?socket.local_addr().ok(),
            "UDP channel bound"
        );

        Ok(Self {
            socket,
            server_addr,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub async fn send(&self, message_bytes: &[u8]) -> Result<usize, DomainError> {
        self.socket
            .send_to(message_bytes, self.server_addr)
            .await
            .map_err(|e| {
                DomainError::Transport(format!(
                    "Failed to send UDP query to {}: {}",
                    self.server_addr, e
                ))
            })
    }

    /// Read the next datagram from the upstream into `buf`, returning its
    /// length. Datagrams from other peers are discarded.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<usize, DomainError> {
        loop {
            let (len, from) = self.socket.recv_from(buf).await.map_err(|e| {
                DomainError::Transport(format!(
                    "Failed to receive UDP response from {}: {}",
                    self.server_addr, e
                ))
            })?;

            if from != self.server_addr {
                debug!(
                    expected = %self.server_addr,
                    from = %from,
                    "Discarding datagram from unexpected peer"
                );
                continue;
            }
            return Ok(len);
        }
    }
}
