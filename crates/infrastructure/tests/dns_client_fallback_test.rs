use async_trait::async_trait;
use ferrous_resolver_application::ports::NameServer;
use ferrous_resolver_application::ResolveContext;
use ferrous_resolver_domain::{DomainError, IpOption};
use ferrous_resolver_infrastructure::dns::{DnsClient, StaticHosts};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Scripted {
    name: &'static str,
    result: Result<Vec<IpAddr>, DomainError>,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(name: &'static str, result: Result<Vec<IpAddr>, DomainError>) -> Arc<Self> {
        Arc::new(Self {
            name,
            result,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NameServer for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    async fn resolve(
        &self,
        _ctx: &ResolveContext,
        _domain: &str,
        _option: IpOption,
    ) -> Result<Vec<IpAddr>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[tokio::test]
async fn test_no_families_means_no_servers_called() {
    let server = Scripted::new("s", Ok(vec![ip("1.1.1.1")]));
    let client = DnsClient::builder().name_server(server.clone()).build().unwrap();

    let ips = client
        .resolve_ip(&ResolveContext::new(), "a.com", IpOption::NONE)
        .await
        .unwrap();
    assert!(ips.is_empty());
    assert_eq!(server.calls(), 0);
}

#[tokio::test]
async fn test_falls_through_to_next_server() {
    let failing = Scripted::new("failing", Err(DomainError::QueryTimeout));
    let working = Scripted::new("working", Ok(vec![ip("1.1.1.1")]));
    let client = DnsClient::builder()
        .name_server(failing.clone())
        .name_server(working.clone())
        .build()
        .unwrap();

    let ips = client
        .resolve_ip(&ResolveContext::new(), "a.com", IpOption::BOTH)
        .await
        .unwrap();
    assert_eq!(ips, vec![ip("1.1.1.1")]);
    assert_eq!(failing.calls(), 1);
}

#[tokio::test]
async fn test_most_specific_error_wins() {
    let client = DnsClient::builder()
        .name_server(Scripted::new("t", Err(DomainError::QueryTimeout)))
        .name_server(Scripted::new("nx", Err(DomainError::ResolutionFailed { code: 3 })))
        .name_server(Scripted::new("io", Err(DomainError::Transport("refused".into()))))
        .build()
        .unwrap();

    let err = client
        .resolve_ip(&ResolveContext::new(), "a.com", IpOption::BOTH)
        .await
        .unwrap_err();
    assert_eq!(err.rcode(), Some(3));
}

#[tokio::test]
async fn test_prioritized_server_goes_first() {
    let general = Scripted::new("general", Ok(vec![ip("8.8.8.8")]));
    let corp = Scripted::new("corp", Ok(vec![ip("10.1.1.1")]));
    let client = DnsClient::builder()
        .name_server(general.clone())
        .prioritized_name_server(corp.clone(), vec!["domain:corp.local".parse().unwrap()])
        .build()
        .unwrap();

    let ips = client
        .resolve_ip(&ResolveContext::new(), "git.corp.local", IpOption::IPV4_ONLY)
        .await
        .unwrap();
    assert_eq!(ips, vec![ip("10.1.1.1")]);
    assert_eq!(general.calls(), 0);

    let ips = client
        .resolve_ip(&ResolveContext::new(), "example.com", IpOption::IPV4_ONLY)
        .await
        .unwrap();
    assert_eq!(ips, vec![ip("8.8.8.8")]);
    assert_eq!(corp.calls(), 1);
}

#[tokio::test]
async fn test_static_host_filtered_by_family() {
    let server = Scripted::new("s", Ok(vec![ip("1.1.1.1")]));
    let hosts = StaticHosts::new(
        &[("v4.lan".to_string(), "192.168.0.10".to_string())].into(),
        &[],
    )
    .unwrap();
    let client = DnsClient::builder()
        .static_hosts(hosts)
        .name_server(server.clone())
        .build()
        .unwrap();

    let err = client
        .resolve_ip(&ResolveContext::new(), "v4.lan", IpOption::IPV6_ONLY)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::RecordNotFound);
    assert_eq!(server.calls(), 0);
}

#[tokio::test]
async fn test_cancelled_caller_stops_iteration() {
    let first = Scripted::new("first", Err(DomainError::Cancelled));
    let second = Scripted::new("second", Ok(vec![ip("1.1.1.1")]));
    let client = DnsClient::builder()
        .name_server(first)
        .name_server(second.clone())
        .build()
        .unwrap();

    let ctx = ResolveContext::new();
    ctx.cancellation_token().cancel();
    let err = client
        .resolve_ip(&ctx, "a.com", IpOption::BOTH)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::Cancelled);
    assert_eq!(second.calls(), 0);
}

#[tokio::test]
async fn test_empty_server_list() {
    let client = DnsClient::builder().build().unwrap();
    assert_eq!(
        client
            .resolve_ip(&ResolveContext::new(), "a.com", IpOption::BOTH)
            .await
            .unwrap_err(),
        DomainError::EmptyServerList
    );
}
