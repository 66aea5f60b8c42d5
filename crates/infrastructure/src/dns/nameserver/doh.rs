use super::{next_query_id, wait_for_answer, NameServerOptions};
use crate::dns::cache::{CacheJanitor, RecordCache};
use crate::dns::forwarding::message_builder::to_fqdn;
use crate::dns::forwarding::{MessageBuilder, QueryMessage, ResponseParser};
use crate::dns::transport::dispatched::DispatchedHttpsTransport;
use crate::dns::transport::https::HttpsTransport;
use crate::dns::transport::Transport;
use async_trait::async_trait;
use ferrous_resolver_application::ports::{NameServer, OutboundDispatcher};
use ferrous_resolver_application::ResolveContext;
use ferrous_resolver_domain::{DomainError, IpOption};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// DNS-over-HTTPS name server.
///
/// Every query is a POST of its own, sent from a spawned task so a caller
/// giving up does not abort it; late answers still land in the cache.
pub struct DohNameServer {
    name: String,
    transport: Arc<Transport>,
    cache: Arc<RecordCache>,
    client_ip: Option<IpAddr>,
    query_timeout: Duration,
}

impl DohNameServer {
    /// Direct HTTP client, for when this process is the egress point.
    pub fn new_local(url: &str, options: &NameServerOptions) -> Result<Self, DomainError> {
        let transport = Transport::Https(HttpsTransport::new(url)?);
        Ok(Self::with_transport(format!("https+local://{}", strip_scheme(url)), transport, options))
    }

    /// Connections opened through the platform dispatcher.
    pub fn new_remote(
        url: &str,
        dispatcher: Arc<dyn OutboundDispatcher>,
        options: &NameServerOptions,
    ) -> Result<Self, DomainError> {
        let transport = Transport::Dispatched(DispatchedHttpsTransport::new(url, dispatcher)?);
        Ok(Self::with_transport(url.to_string(), transport, options))
    }

    fn with_transport(name: String, transport: Transport, options: &NameServerOptions) -> Self {
        let cache = Arc::new(RecordCache::new(name.clone(), options.cleanup_interval));
        CacheJanitor::new(&cache).start();

        info!(
            server = %name,
            url = %transport.url(),
            protocol = transport.protocol_name(),
            "DoH name server started"
        );

        Self {
            name,
            transport: Arc::new(transport),
            cache,
            client_ip: options.client_ip,
            query_timeout: options.query_timeout,
        }
    }

    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    fn spawn_query(
        &self,
        ctx: &ResolveContext,
        query: QueryMessage,
        errors: mpsc::UnboundedSender<DomainError>,
    ) {
        let transport = Arc::clone(&self.transport);
        let cache = Arc::clone(&self.cache);
        let name = self.name.clone();
        let mut send_ctx = ResolveContext::with_timeout(self.query_timeout);
        if let Some(tag) = ctx.inbound_tag() {
            send_ctx = send_ctx.with_inbound_tag(tag);
        }

        tokio::spawn(async move {
            let result = async {
                let bytes = query.to_bytes()?;
                let response = transport.send(&send_ctx, &bytes).await?;
                ResponseParser::parse(&response.bytes)
            }
            .await;

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!(server = %name, domain = %query.domain, error = %e, "DoH query failed");
                    let _ = errors.send(e);
                    return;
                }
            };

            debug!(
                server = %name,
                domain = %query.domain,
                id = record.req_id,
                addresses = record.ips.len(),
                "DoH answer received"
            );
            for record_type in &query.record_types {
                cache.update(&query.domain, *record_type, record.for_record_type(*record_type));
            }
        });
    }
}

#[async_trait]
impl NameServer for DohNameServer {
    fn name(&self) -> &str {
        &self.name
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

        let fqdn = to_fqdn(domain);
        let cached = self.cache.lookup(&fqdn, option);
        if !cached.is_miss() {
            debug!(server = %self.name, domain = %fqdn, "Cache hit");
            return cached.into_result();
        }

        let subscription = self.cache.subscribe(&fqdn);
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();

        let queries =
            MessageBuilder::build_queries(&fqdn, option, || next_query_id(&self.cache), self.client_ip)?;
        for query in queries {
            self.spawn_query(ctx, query, errors_tx.clone());
        }
        drop(errors_tx);

        wait_for_answer(&self.cache, ctx, &fqdn, option, subscription, errors_rx).await
    }
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}
