use ferrous_resolver_infrastructure::dns::{DirectDispatcher, NameServerOptions};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

pub fn options() -> NameServerOptions {
    NameServerOptions {
        client_ip: None,
        query_timeout: Duration::from_secs(2),
        cleanup_interval: Duration::from_secs(60),
        dispatcher: Arc::new(DirectDispatcher),
        multi_question_resolvers: Vec::new(),
    }
}

/// Options under which `server` receives A and AAAA in one message.
pub fn options_coalescing(server: SocketAddr) -> NameServerOptions {
    NameServerOptions {
        multi_question_resolvers: vec![server.ip()],
        ..options()
    }
}

pub fn options_with_client_ip(client_ip: &str) -> NameServerOptions {
    NameServerOptions {
        client_ip: Some(ip(client_ip)),
        ..options()
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}
