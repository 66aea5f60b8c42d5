use super::{DnsTransport, TransportResponse, DNS_MESSAGE_CONTENT_TYPE};
use async_trait::async_trait;
use bytes::Bytes;
use ferrous_resolver_application::ports::OutboundDispatcher;
use ferrous_resolver_application::ResolveContext;
use ferrous_resolver_domain::DomainError;
use http::header::{ACCEPT, CONTENT_TYPE, HOST};
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::OnceCell;
use tokio_rustls::TlsConnector;
use tracing::debug;

/// DNS-over-HTTPS carried on streams from the platform dispatcher.
///
/// Every exchange opens a fresh stream to one of the endpoint's addresses,
/// picked at random, then speaks TLS and HTTP/1.1 over it. `http://`
/// endpoints skip TLS.
pub struct DispatchedHttpsTransport {
    url: String,
    host: String,
    port: u16,
    path: String,
    tls: Option<TlsConnector>,
    dispatcher: Arc<dyn OutboundDispatcher>,
    candidates: OnceCell<Vec<IpAddr>>,
}

impl DispatchedHttpsTransport {
    pub fn new(
        url: impl Into<String>,
        dispatcher: Arc<dyn OutboundDispatcher>,
    ) -> Result<Self, DomainError> {
        let url = url.into();
        let uri: Uri = url
            .parse()
            .map_err(|e| DomainError::Transport(format!("Invalid DoH URL '{}': {}", url, e)))?;

        let secure = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            _ => {
                return Err(DomainError::Transport(format!(
                    "Unsupported DoH URL scheme in '{}'",
                    url
                )))
            }
        };
        let host = uri
            .host()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
            .ok_or_else(|| DomainError::Transport(format!("DoH URL '{}' has no host", url)))?;
        let port = uri.port_u16().unwrap_or(if secure { 443 } else { 80 });
        let path = uri
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "/dns-query".to_string());

        let tls = if secure {
            Some(TlsConnector::from(Arc::new(tls_client_config()?)))
        } else {
            None
        };

        // An IP literal needs no lookup.
        let candidates = match host.parse::<IpAddr>() {
            Ok(ip) => OnceCell::new_with(Some(vec![ip])),
            Err(_) => OnceCell::new(),
        };

        Ok(Self {
            url,
            host,
            port,
            path,
            tls,
            dispatcher,
            candidates,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn candidates(&self) -> Result<&[IpAddr], DomainError> {
        let ips = self
            .candidates
            .get_or_try_init(|| async {
                let ips: Vec<IpAddr> = tokio::net::lookup_host((self.host.as_str(), self.port))
                    .await
                    .map_err(|e| {
                        DomainError::Transport(format!(
                            "Failed to resolve DoH host {}: {}",
                            self.host, e
                        ))
                    })?
                    .map(|addr| addr.ip())
                    .collect();
                if ips.is_empty() {
                    return Err(DomainError::Transport(format!(
                        "DoH host {} has no addresses",
                        self.host
                    )));
                }
                debug!(host = %self.host, candidates = ips.len(), "DoH endpoint resolved");
                Ok(ips)
            })
            .await?;
        Ok(ips.as_slice())
    }

    async fn destination(&self) -> Result<SocketAddr, DomainError> {
        let candidates = self.candidates().await?;
        let ip = candidates[fastrand::usize(..candidates.len())];
        Ok(SocketAddr::new(ip, self.port))
    }

    fn authority(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        match (self.tls.is_some(), self.port) {
            (true, 443) | (false, 80) => host,
            (_, port) => format!("{}:{}", host, port),
        }
    }

    async fn post<S>(&self, stream: S, message_bytes: &[u8]) -> Result<Bytes, DomainError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| DomainError::Transport(format!("HTTP handshake with {} failed: {}", self.url, e)))?;

        let url = self.url.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(url = %url, error = %e, "DoH connection closed with error");
            }
        });

        let request = Request::builder()
            .method(Method::POST)
            .uri(self.path.as_str())
            .header(HOST, self.authority())
            .header(CONTENT_TYPE, DNS_MESSAGE_CONTENT_TYPE)
            .header(ACCEPT, DNS_MESSAGE_CONTENT_TYPE)
            .body(Full::new(Bytes::copy_from_slice(message_bytes)))
            .map_err(|e| DomainError::Transport(format!("Invalid DoH request: {}", e)))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| DomainError::Transport(format!("DoH request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::Transport(format!(
                "DoH server {} returned HTTP {}: {}",
                self.url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response.into_body().collect().await.map_err(|e| {
            DomainError::Transport(format!("Failed to read DoH response from {}: {}", self.url, e))
        })?;
        Ok(body.to_bytes())
    }

    async fn exchange(
        &self,
        ctx: &ResolveContext,
        message_bytes: &[u8],
    ) -> Result<Bytes, DomainError> {
        let destination = self.destination().await?;
        debug!(
            url = %self.url,
            destination = %destination,
            inbound = ?ctx.inbound_tag(),
            "Dispatching DoH connection"
        );
        let stream = self.dispatcher.dispatch(ctx, destination).await?;

        match &self.tls {
            Some(connector) => {
                let server_name = ServerName::try_from(self.host.clone()).map_err(|e| {
                    DomainError::Transport(format!("Invalid TLS server name {}: {}", self.host, e))
                })?;
                let tls_stream = connector.connect(server_name, stream).await.map_err(|e| {
                    DomainError::Transport(format!("TLS handshake with {} failed: {}", self.host, e))
                })?;
                self.post(tls_stream, message_bytes).await
            }
            None => self.post(stream, message_bytes).await,
        }
    }
}

#[async_trait]
impl DnsTransport for DispatchedHttpsTransport {
    async fn send(
        &self,
        ctx: &ResolveContext,
        message_bytes: &[u8],
    ) -> Result<TransportResponse, DomainError> {
        let response_bytes = tokio::select! {
            result = self.exchange(ctx, message_bytes) => result?,
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

fn tls_client_config() -> Result<ClientConfig, DomainError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let mut config =
        ClientConfig::builder_with_provider(Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| DomainError::Transport(format!("TLS configuration failed: {}", e)))?
            .with_root_certificates(roots)
            .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(config)
}
