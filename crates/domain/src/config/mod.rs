//! Configuration module
//!
//! - `root`: main configuration and CLI overrides
//! - `dns`: name servers, static hosts and timeouts
//! - `hosts`: domain patterns and static host entries
//! - `server_address`: name server address forms
//! - `logging`: logging settings
//! - `errors`: configuration errors

pub mod dns;
pub mod errors;
pub mod hosts;
pub mod logging;
pub mod root;
pub mod server_address;

pub use dns::{DnsConfig, NameServerConfig};
pub use errors::ConfigError;
pub use hosts::{normalize_domain, DomainMatchType, DomainPattern, StaticHostConfig};
pub use logging::LoggingConfig;
pub use root::{CliOverrides, Config};
pub use server_address::NameServerAddress;
