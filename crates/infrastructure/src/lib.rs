//! Resolution engine: caches, wire codec, name server strategies and the
//! [`DnsClient`](dns::DnsClient) facade.
pub mod dns;
