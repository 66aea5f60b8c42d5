pub mod cache;
pub mod client;
pub mod events;
pub mod forwarding;
pub mod hosts;
pub mod matcher;
pub mod nameserver;
pub mod transport;

pub use cache::{IpRecord, RecordCache};
pub use client::{DnsClient, DnsClientBuilder};
pub use events::NotificationBus;
pub use hosts::StaticHosts;
pub use nameserver::{create_name_server, ClassicNameServer, LocalNameServer, NameServerOptions};
#[cfg(feature = "dns-over-https")]
pub use nameserver::DohNameServer;
pub use transport::DirectDispatcher;
