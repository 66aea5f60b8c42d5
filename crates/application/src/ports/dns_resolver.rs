use async_trait::async_trait;
use ferrous_resolver_domain::{DomainError, IpOption};
use std::net::IpAddr;

use crate::context::ResolveContext;

/// A single upstream able to turn a domain into addresses.
///
/// Implementations own their cache and in-flight request state; nothing is
/// shared between two name servers.
#[async_trait]
pub trait NameServer: Send + Sync {
    /// Human readable identifier used in logs (`udp://8.8.8.8:53`, `localhost`, ...).
    fn name(&self) -> &str;

    /// Resolve `domain` for the families in `option`.
    ///
    /// Returns `ResolutionFailed` when the upstream answered with a failure
    /// code, `RecordNotFound` for an empty answer, and `QueryTimeout` or
    /// `Cancelled` when the context ended first.
    async fn resolve(
        &self,
        ctx: &ResolveContext,
        domain: &str,
        option: IpOption,
    ) -> Result<Vec<IpAddr>, DomainError>;
}
