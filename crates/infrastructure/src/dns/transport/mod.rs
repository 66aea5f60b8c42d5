pub mod direct;
#[cfg(feature = "dns-over-https")]
pub mod dispatched;
#[cfg(feature = "dns-over-https")]
pub mod https;
pub mod udp;

use async_trait::async_trait;
use ferrous_resolver_application::ResolveContext;
use ferrous_resolver_domain::DomainError;

pub use direct::DirectDispatcher;
pub use udp::{UdpChannel, MAX_UDP_RESPONSE_SIZE};

/// Media type of DoH request and response bodies (RFC 8484 §6).
pub const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

/// Result of a raw DNS transport operation
#[derive(Debug)]
pub struct TransportResponse {
    /// Raw DNS response bytes (wire format)
    pub bytes: Vec<u8>,
}

/// Request/response exchange of one wire message.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn send(
        &self,
        ctx: &ResolveContext,
        message_bytes: &[u8],
    ) -> Result<TransportResponse, DomainError>;

    fn protocol_name(&self) -> &'static str;
}

/// DoH transports, dispatched by match.
#[cfg(feature = "dns-over-https")]
pub enum Transport {
    /// Direct HTTP client.
    Https(https::HttpsTransport),
    /// Through the platform dispatcher.
    Dispatched(dispatched::DispatchedHttpsTransport),
}

#[cfg(feature = "dns-over-https")]
impl Transport {
    pub async fn send(
        &self,
        ctx: &ResolveContext,
        message_bytes: &[u8],
    ) -> Result<TransportResponse, DomainError> {
        match self {
            Self::Https(t) => DnsTransport::send(t, ctx, message_bytes).await,
            Self::Dispatched(t) => DnsTransport::send(t, ctx, message_bytes).await,
        }
    }

    pub fn protocol_name(&self) -> &'static str {
        match self {
            Self::Https(t) => t.protocol_name(),
            Self::Dispatched(t) => t.protocol_name(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Https(t) => t.url(),
            Self::Dispatched(t) => t.url(),
        }
    }
}
