use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

use super::errors::ConfigError;
use super::hosts::{DomainPattern, StaticHostConfig};
use super::server_address::NameServerAddress;

/// One upstream name server.
///
/// `domains` lists patterns this server should be tried first for, e.g. an
/// internal resolver for `domain:corp.local`. Patterns use the same syntax as
/// static hosts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NameServerConfig {
    pub address: String,

    #[serde(default)]
    pub domains: Vec<String>,
}

impl NameServerConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            domains: Vec::new(),
        }
    }

    pub fn parsed_address(&self) -> Result<NameServerAddress, ConfigError> {
        self.address.parse()
    }

    pub fn parsed_domains(&self) -> Result<Vec<DomainPattern>, ConfigError> {
        self.domains.iter().map(|d| d.parse()).collect()
    }
}

/// DNS resolution configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsConfig {
    /// Upstream servers, tried in order.
    #[serde(default = "default_servers")]
    pub servers: Vec<NameServerConfig>,

    /// Legacy exact-domain → IP mapping.
    /// Values that are not IP addresses are rejected with a warning.
    #[serde(default)]
    pub hosts: HashMap<String, String>,

    #[serde(default)]
    pub static_hosts: Vec<StaticHostConfig>,

    /// Client address announced upstream through EDNS0 client subnet.
    #[serde(default)]
    pub client_ip: Option<IpAddr>,

    /// Per-server query timeout in milliseconds.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,

    /// Interval between cache eviction passes.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            hosts: HashMap::new(),
            static_hosts: vec![],
            client_ip: None,
            query_timeout_ms: default_query_timeout(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

impl DnsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::Validation(
                "at least one name server is required".to_string(),
            ));
        }

        for server in &self.servers {
            server.parsed_address()?;
            server.parsed_domains()?;
        }

        for host in &self.static_hosts {
            if host.ips.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "static host '{}' has no addresses",
                    host.domain
                )));
            }
            if host.domain.trim().is_empty() {
                return Err(ConfigError::InvalidDomainPattern(host.domain.clone()));
            }
        }

        if self.query_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "query_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.cleanup_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "cleanup_interval_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_servers() -> Vec<NameServerConfig> {
    vec![
        NameServerConfig::new("8.8.8.8:53"),
        NameServerConfig::new("1.1.1.1:53"),
    ]
}

fn default_query_timeout() -> u64 {
    4000
}

fn default_cleanup_interval() -> u64 {
    60
}
