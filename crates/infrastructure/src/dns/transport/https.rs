use super::{DnsTransport, TransportResponse, DNS_MESSAGE_CONTENT_TYPE};
use async_trait::async_trait;
use ferrous_resolver_application::ResolveContext;
use ferrous_resolver_domain::DomainError;
use std::time::Duration;
use tracing::debug;

/// Upper bound for a single exchange when the caller has no deadline.
const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// DNS-over-HTTPS through a direct HTTP client (RFC 8484).
///
/// Used when this process is itself the egress point.
pub struct HttpsTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpsTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(DEFAULT_EXCHANGE_TIMEOUT)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| DomainError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DnsTransport for HttpsTransport {
    async fn send(
        &self,
        ctx: &ResolveContext,
        message_bytes: &[u8],
    ) -> Result<TransportResponse, DomainError> {
        debug!(
            url = %self.url,
            message_len = message_bytes.len(),
            "Sending DoH query"
        );

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", DNS_MESSAGE_CONTENT_TYPE)
            .header("Accept", DNS_MESSAGE_CONTENT_TYPE)
            .body(message_bytes.to_vec());
        if let Some(deadline) = ctx.deadline() {
            request = request.timeout(deadline.saturating_duration_since(tokio::time::Instant::now()));
        }

        let exchange = async {
            let response = request.send().await.map_err(|e| {
                DomainError::Transport(format!("DoH request to {} failed: {}", self.url, e))
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(DomainError::Transport(format!(
                    "DoH server {} returned HTTP {}: {}",
                    self.url,
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                )));
            }

            response.bytes().await.map_err(|e| {
                DomainError::Transport(format!(
                    "Failed to read DoH response from {}: {}",
                    self.url, e
                ))
            })
        };

        let response_bytes = tokio::select! {
            result = exchange => result?,
            err = ctx.done() => return Err(err),
        };

        debug!(
            url = %self.url,
            response_len = response_bytes.len(),
            "DoH response received"
        );

        Ok(TransportResponse {
            bytes: response_bytes.to_vec(),
        })
    }

    fn protocol_name(&self) -> &'static str {
        "HTTPS"
    }
}
