//! Name server strategies.
//!
//! `classic` speaks plain DNS over UDP, `doh` DNS-over-HTTPS and `local`
//! asks the host resolver. The first two keep their own [`RecordCache`] and
//! share [`wait_for_answer`] to block until the cache fills.

pub mod classic;
#[cfg(feature = "dns-over-https")]
pub mod doh;
pub mod local;

pub use classic::ClassicNameServer;
#[cfg(feature = "dns-over-https")]
pub use doh::DohNameServer;
pub use local::LocalNameServer;

use crate::dns::cache::RecordCache;
use crate::dns::events::Subscription;
use ferrous_resolver_application::ports::{NameServer, OutboundDispatcher};
use ferrous_resolver_application::ResolveContext;
use ferrous_resolver_domain::config::NameServerAddress;
use ferrous_resolver_domain::{DomainError, IpOption};
use hickory_proto::rr::RecordType;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Settings shared by every name server built from configuration.
#[derive(Clone)]
pub struct NameServerOptions {
    pub client_ip: Option<IpAddr>,
    pub query_timeout: Duration,
    pub cleanup_interval: Duration,
    pub dispatcher: Arc<dyn OutboundDispatcher>,
    /// Classic servers at these addresses get A and AAAA in one message.
    pub multi_question_resolvers: Vec<IpAddr>,
}

pub async fn create_name_server(
    address: &NameServerAddress,
    options: &NameServerOptions,
) -> Result<Arc<dyn NameServer>, DomainError> {
    match address {
        NameServerAddress::Udp(addr) => {
            Ok(Arc::new(ClassicNameServer::new(*addr, options).await?))
        }

        #[cfg(feature = "dns-over-https")]
        NameServerAddress::Https { url, local: true } => {
            Ok(Arc::new(DohNameServer::new_local(url, options)?))
        }

        #[cfg(feature = "dns-over-https")]
        NameServerAddress::Https { url, local: false } => Ok(Arc::new(DohNameServer::new_remote(
            url,
            Arc::clone(&options.dispatcher),
            options,
        )?)),

        #[cfg(not(feature = "dns-over-https"))]
        NameServerAddress::Https { url, .. } => Err(DomainError::Transport(format!(
            "HTTPS feature not enabled. Enable 'dns-over-https' feature to use: {}",
            url
        ))),

        NameServerAddress::Local => Ok(Arc::new(LocalNameServer::new())),
    }
}

/// Query id not currently in flight for `cache`.
pub(crate) fn next_query_id(cache: &RecordCache) -> u16 {
    loop {
        let id = fastrand::u16(..);
        if !cache.is_pending(id) {
            return id;
        }
    }
}

/// Re-check `cache` on every notification until it holds an answer for
/// `fqdn` or `ctx` ends.
///
/// An authoritative failure or an empty answer ends the wait at once.
/// Send failures reported on `send_errors` do not; the last one replaces
/// `QueryTimeout` if the deadline passes. Subscribe before sending so no
/// update can slip in between.
pub(crate) async fn wait_for_answer(
    cache: &RecordCache,
    ctx: &ResolveContext,
    fqdn: &str,
    option: IpOption,
    mut subscription: Subscription<RecordType>,
    mut send_errors: mpsc::UnboundedReceiver<DomainError>,
) -> Result<Vec<IpAddr>, DomainError> {
    let mut last_error = None;
    loop {
        let lookup = cache.lookup(fqdn, option);
        if !lookup.is_miss() {
            return lookup.into_result();
        }

        tokio::select! {
            notified = subscription.recv() => {
                if notified.is_none() {
                    return Err(DomainError::RecordNotFound);
                }
            }
            Some(e) = send_errors.recv() => {
                last_error = Some(e);
            }
            err = ctx.done() => {
                debug!(server = %cache.name(), domain = %fqdn, error = %err, "Gave up waiting for answer");
                return Err(match (err, last_error) {
                    (DomainError::QueryTimeout, Some(e)) => e,
                    (err, _) => err,
                });
            }
        }
    }
}
