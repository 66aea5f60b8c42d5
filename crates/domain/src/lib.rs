//! Domain layer for the resolver: errors, address-family options and config.
pub mod config;
pub mod errors;
pub mod ip_option;

pub use config::{CliOverrides, Config, ConfigError};
pub use errors::DomainError;
pub use ip_option::IpOption;
