#![cfg(feature = "dns-over-https")]

use ferrous_resolver_application::ports::NameServer;
use ferrous_resolver_application::ResolveContext;
use ferrous_resolver_domain::{DomainError, IpOption};
use ferrous_resolver_infrastructure::dns::{DirectDispatcher, DohNameServer};
use std::sync::Arc;
use std::time::Duration;

mod helpers;
use helpers::{ip, options, MockDohServer, MockZone};

fn ctx() -> ResolveContext {
    ResolveContext::with_timeout(Duration::from_secs(2))
}

fn zone() -> MockZone {
    MockZone::new()
        .with("dual.example", &["10.0.0.1", "fd00::1"])
        .with("v4.example", &["10.0.0.2"])
        .nxdomain("missing.example")
        .silent("broken.example")
}

// ============================================================================
// Direct HTTP client
// ============================================================================

#[tokio::test]
async fn test_local_resolves_ipv4() {
    let upstream = MockDohServer::start(zone()).await.unwrap();
    let server = DohNameServer::new_local(&upstream.url(), &options()).unwrap();

    let ips = server.resolve(&ctx(), "v4.example", IpOption::IPV4_ONLY).await.unwrap();
    assert_eq!(ips, vec![ip("10.0.0.2")]);
    assert_eq!(upstream.request_count(), 1);
}

#[tokio::test]
async fn test_local_name_marks_direct_mode() {
    let upstream = MockDohServer::start(zone()).await.unwrap();
    let server = DohNameServer::new_local(&upstream.url(), &options()).unwrap();

    assert!(server.name().starts_with("https+local://"));
}

#[tokio::test]
async fn test_local_both_families_one_request_each() {
    let upstream = MockDohServer::start(zone()).await.unwrap();
    let server = DohNameServer::new_local(&upstream.url(), &options()).unwrap();

    server.resolve(&ctx(), "dual.example", IpOption::BOTH).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(upstream.request_count(), 2);
    let ips = server.resolve(&ctx(), "dual.example", IpOption::BOTH).await.unwrap();
    assert_eq!(ips, vec![ip("fd00::1"), ip("10.0.0.1")]);
    assert_eq!(upstream.request_count(), 2);
}

#[tokio::test]
async fn test_local_nxdomain() {
    let upstream = MockDohServer::start(zone()).await.unwrap();
    let server = DohNameServer::new_local(&upstream.url(), &options()).unwrap();

    let err = server
        .resolve(&ctx(), "missing.example", IpOption::IPV4_ONLY)
        .await
        .unwrap_err();
    assert_eq!(err.rcode(), Some(3));
}

#[tokio::test]
async fn test_http_error_reported_when_deadline_passes() {
    let upstream = MockDohServer::start(zone()).await.unwrap();
    let server = DohNameServer::new_local(&upstream.url(), &options()).unwrap();

    let ctx = ResolveContext::with_timeout(Duration::from_millis(300));
    let err = server
        .resolve(&ctx, "broken.example", IpOption::IPV4_ONLY)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_no_family_no_request() {
    let upstream = MockDohServer::start(zone()).await.unwrap();
    let server = DohNameServer::new_local(&upstream.url(), &options()).unwrap();

    let ips = server.resolve(&ctx(), "v4.example", IpOption::NONE).await.unwrap();
    assert!(ips.is_empty());
    assert_eq!(upstream.request_count(), 0);
}

// ============================================================================
// Through the outbound dispatcher
// ============================================================================

#[tokio::test]
async fn test_remote_resolves_through_dispatcher() {
    let upstream = MockDohServer::start(zone()).await.unwrap();
    let server =
        DohNameServer::new_remote(&upstream.url(), Arc::new(DirectDispatcher), &options()).unwrap();

    let ips = server.resolve(&ctx(), "v4.example", IpOption::IPV4_ONLY).await.unwrap();
    assert_eq!(ips, vec![ip("10.0.0.2")]);
    assert_eq!(server.name(), upstream.url());
}

#[tokio::test]
async fn test_remote_nxdomain() {
    let upstream = MockDohServer::start(zone()).await.unwrap();
    let server =
        DohNameServer::new_remote(&upstream.url(), Arc::new(DirectDispatcher), &options()).unwrap();

    let err = server
        .resolve(&ctx(), "missing.example", IpOption::IPV4_ONLY)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::ResolutionFailed { code: 3 });
}

#[tokio::test]
async fn test_remote_concurrent_callers() {
    let upstream = MockDohServer::start(zone()).await.unwrap();
    let server = Arc::new(
        DohNameServer::new_remote(&upstream.url(), Arc::new(DirectDispatcher), &options()).unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                server.resolve(&ctx(), "dual.example", IpOption::IPV4_ONLY).await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), vec![ip("10.0.0.1")]);
    }
}

#[test]
fn test_remote_rejects_unsupported_scheme() {
    let result = DohNameServer::new_remote(
        "ftp://dns.example/dns-query",
        Arc::new(DirectDispatcher),
        &options(),
    );
    assert!(result.is_err());
}
