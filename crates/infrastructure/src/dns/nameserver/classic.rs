use super::{next_query_id, wait_for_answer, NameServerOptions};
use crate::dns::cache::{CacheJanitor, PendingRequest, RecordCache};
use crate::dns::forwarding::message_builder::{supports_multi_question, to_fqdn};
use crate::dns::forwarding::{MessageBuilder, ResponseParser};
use crate::dns::transport::{UdpChannel, MAX_UDP_RESPONSE_SIZE};
use async_trait::async_trait;
use ferrous_resolver_application::ports::NameServer;
use ferrous_resolver_application::ResolveContext;
use ferrous_resolver_domain::{DomainError, IpOption};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Plain DNS over one UDP socket.
///
/// A background task reads every datagram, matches it to a pending request
/// by message id and writes the answer into the cache. Resolvers only send
/// and then wait on cache notifications.
pub struct ClassicNameServer {
    name: String,
    channel: Arc<UdpChannel>,
    cache: Arc<RecordCache>,
    client_ip: Option<IpAddr>,
    query_timeout: Duration,
    coalesce: bool,
    shutdown: CancellationToken,
}

impl ClassicNameServer {
    pub async fn new(server_addr: SocketAddr, options: &NameServerOptions) -> Result<Self, DomainError> {
        let name = format!("udp://{}", server_addr);
        let channel = Arc::new(UdpChannel::bind(server_addr).await?);
        let cache = Arc::new(RecordCache::new(name.clone(), options.cleanup_interval));
        let shutdown = CancellationToken::new();

        tokio::spawn(receive_loop(
            Arc::clone(&channel),
            Arc::clone(&cache),
            shutdown.clone(),
        ));
        CacheJanitor::new(&cache).start();

        let coalesce = supports_multi_question(server_addr, &options.multi_question_resolvers);
        info!(server = %name, coalesce, "Classic name server started");

        Ok(Self {
            name,
            channel,
            cache,
            client_ip: options.client_ip,
            query_timeout: options.query_timeout,
            coalesce,
            shutdown,
        })
    }

    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    /// Send the queries for `fqdn`. Failures are reported on `errors`
    /// rather than returned so the caller keeps waiting.
    async fn send_queries(
        &self,
        fqdn: &str,
        option: IpOption,
        errors: &mpsc::UnboundedSender<DomainError>,
    ) {
        let queries = match MessageBuilder::build_queries(
            fqdn,
            option,
            || next_query_id(&self.cache),
            self.client_ip,
        ) {
            Ok(queries) if self.coalesce => MessageBuilder::coalesce(queries),
            Ok(queries) => queries,
            Err(e) => {
                warn!(server = %self.name, domain = %fqdn, error = %e, "Failed to build query");
                let _ = errors.send(e);
                return;
            }
        };

        for query in queries {
            let bytes = match query.to_bytes() {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(server = %self.name, domain = %fqdn, error = %e, "Failed to encode query");
                    let _ = errors.send(e);
                    continue;
                }
            };

            let now = Instant::now();
            let tracked = self.cache.insert_pending(
                query.id,
                PendingRequest {
                    domain: query.domain.clone(),
                    record_types: query.record_types.clone(),
                    sent_at: now,
                    deadline: now + self.query_timeout,
                },
            );
            if !tracked {
                debug!(server = %self.name, id = query.id, "Query id already in flight");
            }

            match self.channel.send(&bytes).await {
                Ok(sent) => debug!(
                    server = %self.name,
                    domain = %fqdn,
                    id = query.id,
                    record_types = ?query.record_types,
                    bytes = sent,
                    "Query sent"
                ),
                Err(e) => {
                    warn!(server = %self.name, domain = %fqdn, error = %e, "Query send failed");
                    self.cache.take_pending(query.id);
                    let _ = errors.send(e);
                }
            }
        }
    }
}

impl Drop for ClassicNameServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl NameServer for ClassicNameServer {
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
        self.send_queries(&fqdn, option, &errors_tx).await;
        drop(errors_tx);

        wait_for_answer(&self.cache, ctx, &fqdn, option, subscription, errors_rx).await
    }
}

const RECV_RETRY_BASE: Duration = Duration::from_millis(50);
const RECV_RETRY_MAX: Duration = Duration::from_secs(2);

/// Pause after the `failures`-th consecutive receive error: doubles from
/// 50ms up to 2s.
fn recv_retry_delay(failures: u32) -> Duration {
    RECV_RETRY_BASE
        .saturating_mul(1u32 << failures.min(16))
        .min(RECV_RETRY_MAX)
}

async fn receive_loop(channel: Arc<UdpChannel>, cache: Arc<RecordCache>, shutdown: CancellationToken) {
    let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
    let mut failures = 0u32;

    loop {
        let len = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = channel.recv(&mut buf) => match result {
                Ok(len) => len,
                Err(e) => {
                    let delay = recv_retry_delay(failures);
                    failures = failures.saturating_add(1);
                    warn!(
                        server = %cache.name(),
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "UDP receive failed"
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(delay) => continue,
                    }
                }
            },
        };
        failures = 0;

        let record = match ResponseParser::parse(&buf[..len]) {
            Ok(record) => record,
            Err(e) => {
                warn!(server = %cache.name(), error = %e, "Dropping malformed response");
                continue;
            }
        };

        let Some(request) = cache.take_pending(record.req_id) else {
            debug!(server = %cache.name(), id = record.req_id, "Dropping response for unknown id");
            continue;
        };

        debug!(
            server = %cache.name(),
            domain = %request.domain,
            id = record.req_id,
            elapsed_ms = request.sent_at.elapsed().as_millis() as u64,
            "Response received"
        );

        for record_type in &request.record_types {
            cache.update(&request.domain, *record_type, record.for_record_type(*record_type));
        }
    }

    debug!(server = %cache.name(), "UDP receive loop stopped");
}
