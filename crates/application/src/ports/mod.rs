pub mod dns_resolver;
pub mod outbound_dispatcher;

pub use dns_resolver::NameServer;
pub use outbound_dispatcher::{OutboundDispatcher, OutboundStream};
