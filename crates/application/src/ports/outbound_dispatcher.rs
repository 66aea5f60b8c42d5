use async_trait::async_trait;
use ferrous_resolver_domain::DomainError;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::context::ResolveContext;

/// Byte stream handed out by the platform's outbound layer.
pub trait OutboundStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> OutboundStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Opens a connection to `destination` through the platform's routing.
///
/// DNS-over-HTTPS in remote mode rides on these streams instead of opening
/// sockets itself.
#[async_trait]
pub trait OutboundDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        ctx: &ResolveContext,
        destination: SocketAddr,
    ) -> Result<Box<dyn OutboundStream>, DomainError>;
}
