#![allow(dead_code)]
pub mod builders;
pub mod dns_server_mock;
pub mod doh_server_mock;

pub use builders::{ip, options, options_coalescing, options_with_client_ip};
pub use dns_server_mock::{MockAnswer, MockDnsServer, MockZone};
pub use doh_server_mock::MockDohServer;
