use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use super::errors::ConfigError;

const DEFAULT_DNS_PORT: u16 = 53;

/// Where a configured name server lives and how it is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameServerAddress {
    /// Plain DNS over UDP.
    Udp(SocketAddr),

    /// DNS-over-HTTPS. `local` selects a direct HTTP client instead of
    /// tunnelling through the platform dispatcher.
    Https { url: String, local: bool },

    /// Host operating system resolver.
    Local,
}

impl FromStr for NameServerAddress {
    type Err = ConfigError;

    /// Accepted forms:
    /// - `localhost`
    /// - `https://host/path` (remote DoH), `https+local://host/path` (direct DoH)
    /// - `udp://ip[:port]`, `ip`, `ip:port`, `[v6]:port`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("localhost") {
            return Ok(Self::Local);
        }

        if let Some(rest) = s.strip_prefix("https+local://") {
            return Ok(Self::Https {
                url: format!("https://{}", rest),
                local: true,
            });
        }

        if s.starts_with("https://") {
            return Ok(Self::Https {
                url: s.to_string(),
                local: false,
            });
        }

        let host = s.strip_prefix("udp://").unwrap_or(s);

        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(Self::Udp(addr));
        }

        let bare = host.trim_start_matches('[').trim_end_matches(']');
        bare.parse::<IpAddr>()
            .map(|ip| Self::Udp(SocketAddr::new(ip, DEFAULT_DNS_PORT)))
            .map_err(|_| ConfigError::InvalidServerAddress(s.to_string()))
    }
}

impl fmt::Display for NameServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp(addr) => write!(f, "udp://{}", addr),
            Self::Https { url, local: false } => write!(f, "{}", url),
            Self::Https { url, local: true } => {
                write!(f, "https+local://{}", url.trim_start_matches("https://"))
            }
            Self::Local => write!(f, "localhost"),
        }
    }
}
