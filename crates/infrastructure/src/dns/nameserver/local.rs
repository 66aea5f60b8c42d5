use async_trait::async_trait;
use ferrous_resolver_application::ports::NameServer;
use ferrous_resolver_application::ResolveContext;
use ferrous_resolver_domain::{DomainError, IpOption};
use std::net::IpAddr;
use tracing::debug;

/// Hands lookups to the host operating system resolver.
///
/// No cache of its own and no wire messages; every call is one lookup.
#[derive(Debug, Default)]
pub struct LocalNameServer;

impl LocalNameServer {
    pub fn new() -> Self {
        Self
    }

    async fn lookup(domain: &str) -> Result<Vec<IpAddr>, DomainError> {
        let addrs = tokio::net::lookup_host((domain, 0))
            .await
            .map_err(|e| DomainError::Transport(format!("System lookup of {} failed: {}", domain, e)))?;

        let mut ips: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            if !ips.contains(&addr.ip()) {
                ips.push(addr.ip());
            }
        }
        Ok(ips)
    }
}

#[async_trait]
impl NameServer for LocalNameServer {
    fn name(&self) -> &str {
        "localhost"
    }

    async fn resolve(
        &self,
        ctx: &ResolveContext,
        domain: &str,
        option: IpOption,
    ) -> Result<Vec<IpAddr>, DomainError> {
        if option.is_empty() {
            return Ok(Vec::new());
        }

        let domain = domain.trim_end_matches('.');
        let ips = tokio::select! {
            result = Self::lookup(domain) => result?,
            err = ctx.done() => return Err(err),
        };

        let ips = option.filter(&ips);
        debug!(domain = %domain, addresses = ips.len(), "System resolver answered");
        if ips.is_empty() {
            return Err(DomainError::RecordNotFound);
        }
        Ok(ips)
    }
}
