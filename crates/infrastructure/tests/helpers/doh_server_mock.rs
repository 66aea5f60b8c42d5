use super::dns_server_mock::MockZone;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Plain-HTTP DoH endpoint answering POSTs on `/dns-query` from a [`MockZone`].
pub struct MockDohServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    requests: Arc<AtomicUsize>,
}

impl MockDohServer {
    pub async fn start(zone: MockZone) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let requests = Arc::new(AtomicUsize::new(0));
        let zone = Arc::new(zone);

        let counter = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let stream = tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, _)) => stream,
                        Err(_) => continue,
                    },
                };

                let zone = Arc::clone(&zone);
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let zone = Arc::clone(&zone);
                        let counter = Arc::clone(&counter);
                        async move { Ok::<_, Infallible>(handle(req, &zone, &counter).await) }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            requests,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}/dns-query", self.addr)
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for MockDohServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle(
    req: Request<Incoming>,
    zone: &MockZone,
    counter: &AtomicUsize,
) -> Response<Full<Bytes>> {
    if req.method() != Method::POST || req.uri().path() != "/dns-query" {
        return status(StatusCode::NOT_FOUND);
    }
    counter.fetch_add(1, Ordering::SeqCst);

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return status(StatusCode::BAD_REQUEST),
    };

    match zone.respond(&body) {
        Some(answer) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/dns-message")
            .body(Full::new(Bytes::from(answer)))
            .unwrap(),
        None => status(StatusCode::SERVICE_UNAVAILABLE),
    }
}

fn status(code: StatusCode) -> Response<Full<Bytes>> {
    Response::builder()
        .status(code)
        .body(Full::new(Bytes::new()))
        .unwrap()
}
