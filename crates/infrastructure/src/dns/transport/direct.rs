use async_trait::async_trait;
use ferrous_resolver_application::ports::{OutboundDispatcher, OutboundStream};
use ferrous_resolver_application::ResolveContext;
use ferrous_resolver_domain::DomainError;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tracing::debug;

/// Dispatcher that connects straight to the destination over TCP.
///
/// Stands in for the platform routing layer when the resolver runs on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectDispatcher;

#[async_trait]
impl OutboundDispatcher for DirectDispatcher {
    async fn dispatch(
        &self,
        ctx: &ResolveContext,
        destination: SocketAddr,
    ) -> Result<Box<dyn OutboundStream>, DomainError> {
        let stream = tokio::select! {
            result = TcpStream::connect(destination) => result.map_err(|e| {
                DomainError::Transport(format!("Failed to connect to {}: {}", destination, e))
            })?,
            err = ctx.done() => return Err(err),
        };
        let _ = stream.set_nodelay(true);
        debug!(destination = %destination, "Direct connection established");
        Ok(Box::new(stream))
    }
}
