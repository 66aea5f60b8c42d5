#![allow(dead_code)]
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{RData, Record, RecordType};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

/// What the mock answers for one name.
#[derive(Debug, Clone)]
pub enum MockAnswer {
    Addresses(Vec<IpAddr>),
    NxDomain,
    /// Never reply.
    Silent,
}

/// Name → answer table. Names are stored fully qualified and lowercase.
#[derive(Debug, Clone, Default)]
pub struct MockZone {
    records: HashMap<String, MockAnswer>,
    ttl: u32,
}

impl MockZone {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            ttl: 60,
        }
    }

    pub fn with(mut self, domain: &str, ips: &[&str]) -> Self {
        self.records.insert(
            fqdn(domain),
            MockAnswer::Addresses(ips.iter().map(|ip| ip.parse().unwrap()).collect()),
        );
        self
    }

    pub fn nxdomain(mut self, domain: &str) -> Self {
        self.records.insert(fqdn(domain), MockAnswer::NxDomain);
        self
    }

    pub fn silent(mut self, domain: &str) -> Self {
        self.records.insert(fqdn(domain), MockAnswer::Silent);
        self
    }

    pub fn ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Wire response for `query_bytes`, or `None` to stay silent.
    pub fn respond(&self, query_bytes: &[u8]) -> Option<Vec<u8>> {
        let query = Message::from_vec(query_bytes).ok()?;

        let mut response = Message::new(query.id(), MessageType::Response, OpCode::Query);
        response.set_recursion_desired(query.recursion_desired());
        response.set_recursion_available(true);

        for question in query.queries() {
            response.add_query(question.clone());
            let name = question.name().to_ascii().to_ascii_lowercase();

            match self.records.get(&name) {
                Some(MockAnswer::Silent) => return None,
                Some(MockAnswer::NxDomain) | None => {
                    response.set_response_code(ResponseCode::NXDomain);
                }
                Some(MockAnswer::Addresses(ips)) => {
                    for ip in ips {
                        let rdata = match (question.query_type(), ip) {
                            (RecordType::A, IpAddr::V4(v4)) => RData::A(A(*v4)),
                            (RecordType::AAAA, IpAddr::V6(v6)) => RData::AAAA(AAAA(*v6)),
                            _ => continue,
                        };
                        response.add_answer(Record::from_rdata(
                            question.name().clone(),
                            self.ttl,
                            rdata,
                        ));
                    }
                }
            }
        }

        response.to_vec().ok()
    }
}

fn fqdn(domain: &str) -> String {
    let domain = domain.to_ascii_lowercase();
    if domain.ends_with('.') {
        domain
    } else {
        format!("{}.", domain)
    }
}

/// Mock UDP DNS server for tests
///
/// Answers from a [`MockZone`], counts datagrams and keeps every decoded
/// query for inspection.
pub struct MockDnsServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    queries: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Message>>>,
}

impl MockDnsServer {
    pub async fn start(zone: MockZone) -> Result<Self, std::io::Error> {
        Self::start_with_delay(zone, Duration::ZERO).await
    }

    /// Replies are sent `delay` after each query arrives.
    pub async fn start_with_delay(zone: MockZone, delay: Duration) -> Result<Self, std::io::Error> {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await?);
        let addr = socket.local_addr()?;

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let queries = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));

        let counter = Arc::clone(&queries);
        let log = Arc::clone(&received);
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = socket.recv_from(&mut buf) => {
                        let Ok((len, peer)) = result else { continue };
                        counter.fetch_add(1, Ordering::SeqCst);
                        if let Ok(message) = Message::from_vec(&buf[..len]) {
                            log.lock().unwrap().push(message);
                        }

                        let Some(response) = zone.respond(&buf[..len]) else { continue };
                        let socket = Arc::clone(&socket);
                        tokio::spawn(async move {
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                            let _ = socket.send_to(&response, peer).await;
                        });
                    }
                }
            }
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            queries,
            received,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Datagrams received so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Message> {
        self.received.lock().unwrap().clone()
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
