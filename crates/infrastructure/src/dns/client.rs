use super::forwarding::MULTI_QUESTION_RESOLVERS;
use super::hosts::StaticHosts;
use super::matcher::DomainMatcherGroup;
use super::nameserver::{create_name_server, NameServerOptions};
use ferrous_resolver_application::ports::{NameServer, OutboundDispatcher};
use ferrous_resolver_application::ResolveContext;
use ferrous_resolver_domain::config::{DnsConfig, DomainPattern};
use ferrous_resolver_domain::{ConfigError, DomainError, IpOption};
use smallvec::SmallVec;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(4000);

struct ServerEntry {
    server: Arc<dyn NameServer>,
    /// Names this server is tried first for.
    prioritized: Option<DomainMatcherGroup>,
}

/// Entry point of the resolver: static hosts first, then name servers in
/// order until one produces addresses.
pub struct DnsClient {
    hosts: StaticHosts,
    servers: Vec<ServerEntry>,
    query_timeout: Duration,
}

impl DnsClient {
    pub fn builder() -> DnsClientBuilder {
        DnsClientBuilder::default()
    }

    /// Build every configured name server and the static host table.
    pub async fn from_config(
        config: &DnsConfig,
        dispatcher: Arc<dyn OutboundDispatcher>,
    ) -> Result<Self, DomainError> {
        let options = NameServerOptions {
            client_ip: config.client_ip,
            query_timeout: Duration::from_millis(config.query_timeout_ms),
            cleanup_interval: Duration::from_secs(config.cleanup_interval_secs),
            dispatcher,
            multi_question_resolvers: MULTI_QUESTION_RESOLVERS.to_vec(),
        };

        let mut builder = Self::builder()
            .static_hosts(StaticHosts::from_config(config)?)
            .query_timeout(options.query_timeout);

        for server_config in &config.servers {
            let address = server_config.parsed_address()?;
            let server = create_name_server(&address, &options).await?;
            builder = builder.prioritized_name_server(server, server_config.parsed_domains()?);
        }

        let client = builder.build()?;
        info!(
            servers = client.servers.len(),
            static_hosts = client.hosts.len(),
            "DNS client ready"
        );
        Ok(client)
    }

    pub fn static_hosts(&self) -> &StaticHosts {
        &self.hosts
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(|e| e.server.name()).collect()
    }

    /// Resolve `domain` for the families in `option`.
    ///
    /// Asking for neither family returns an empty list without any I/O.
    /// When every server fails, the most specific error seen is returned.
    pub async fn resolve_ip(
        &self,
        ctx: &ResolveContext,
        domain: &str,
        option: IpOption,
    ) -> Result<Vec<IpAddr>, DomainError> {
        if option.is_empty() {
            return Ok(Vec::new());
        }

        let domain = domain.trim();
        if domain.is_empty() || domain == "." {
            return Err(DomainError::InvalidDomainName(domain.to_string()));
        }

        if let Some(ips) = self.hosts.lookup(domain) {
            let ips = option.filter(ips);
            debug!(domain = %domain, addresses = ips.len(), "Static host match");
            if ips.is_empty() {
                return Err(DomainError::RecordNotFound);
            }
            return Ok(ips);
        }

        if self.servers.is_empty() {
            return Err(DomainError::EmptyServerList);
        }

        let mut best: Option<DomainError> = None;
        for entry in self.ordered_servers(domain) {
            let server_ctx = ctx.child_with_timeout(self.query_timeout);
            match entry.server.resolve(&server_ctx, domain, option).await {
                Ok(ips) if !ips.is_empty() => {
                    debug!(
                        domain = %domain,
                        server = %entry.server.name(),
                        addresses = ips.len(),
                        "Resolved"
                    );
                    return Ok(ips);
                }
                Ok(_) => Self::keep_most_specific(&mut best, DomainError::RecordNotFound),
                Err(e) => {
                    debug!(domain = %domain, server = %entry.server.name(), error = %e, "Name server failed");
                    if let Some(caller_err) = ctx.err() {
                        return Err(best
                            .filter(|b| b.specificity() > caller_err.specificity())
                            .unwrap_or(caller_err));
                    }
                    Self::keep_most_specific(&mut best, e);
                }
            }
        }

        Err(best.unwrap_or(DomainError::RecordNotFound))
    }

    /// Servers whose prioritized patterns match `domain` come first,
    /// otherwise configuration order is kept.
    fn ordered_servers(&self, domain: &str) -> SmallVec<[&ServerEntry; 4]> {
        let (mut first, rest): (SmallVec<[&ServerEntry; 4]>, SmallVec<[&ServerEntry; 4]>) =
            self.servers.iter().partition(|entry| {
                entry
                    .prioritized
                    .as_ref()
                    .is_some_and(|group| group.best_match(domain).is_some())
            });
        first.extend(rest);
        first
    }

    fn keep_most_specific(best: &mut Option<DomainError>, err: DomainError) {
        match best {
            Some(current) if current.specificity() >= err.specificity() => {}
            _ => *best = Some(err),
        }
    }
}

#[derive(Default)]
pub struct DnsClientBuilder {
    hosts: Option<StaticHosts>,
    servers: Vec<(Arc<dyn NameServer>, Vec<DomainPattern>)>,
    query_timeout: Option<Duration>,
}

impl DnsClientBuilder {
    pub fn static_hosts(mut self, hosts: StaticHosts) -> Self {
        self.hosts = Some(hosts);
        self
    }

    pub fn name_server(self, server: Arc<dyn NameServer>) -> Self {
        self.prioritized_name_server(server, Vec::new())
    }

    pub fn prioritized_name_server(
        mut self,
        server: Arc<dyn NameServer>,
        domains: Vec<DomainPattern>,
    ) -> Self {
        self.servers.push((server, domains));
        self
    }

    /// Per-server budget, further capped by the caller's deadline.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<DnsClient, ConfigError> {
        let servers = self
            .servers
            .into_iter()
            .map(|(server, domains)| {
                let prioritized = if domains.is_empty() {
                    None
                } else {
                    let mut group = DomainMatcherGroup::builder();
                    for pattern in &domains {
                        group.add(pattern)?;
                    }
                    Some(group.build()?)
                };
                Ok(ServerEntry {
                    server,
                    prioritized,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(DnsClient {
            hosts: self.hosts.unwrap_or_else(StaticHosts::empty),
            servers,
            query_timeout: self.query_timeout.unwrap_or(DEFAULT_QUERY_TIMEOUT),
        })
    }
}
