use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use super::errors::ConfigError;

/// How a domain pattern is compared against a queried name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainMatchType {
    /// Exact name only.
    #[default]
    Full,
    /// The name itself and every subdomain of it.
    Domain,
    /// Substring anywhere in the name.
    Keyword,
    /// Regular expression over the whole name.
    Regexp,
}

impl DomainMatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Domain => "domain",
            Self::Keyword => "keyword",
            Self::Regexp => "regexp",
        }
    }
}

/// A match type paired with its pattern text.
///
/// Textual form is `type:value` (`full:a.com`, `domain:a.com`, `keyword:ads`,
/// `regexp:^cdn[0-9]+\.`). A value without prefix is a `domain:` pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainPattern {
    pub match_type: DomainMatchType,
    pub value: String,
}

impl DomainPattern {
    pub fn new(match_type: DomainMatchType, value: impl Into<String>) -> Self {
        let value = value.into();
        let value = match match_type {
            DomainMatchType::Regexp => value,
            _ => normalize_domain(&value),
        };
        Self { match_type, value }
    }
}

impl FromStr for DomainPattern {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (match_type, value) = match s.split_once(':') {
            Some(("full", rest)) => (DomainMatchType::Full, rest),
            Some(("domain", rest)) => (DomainMatchType::Domain, rest),
            Some(("keyword", rest)) => (DomainMatchType::Keyword, rest),
            Some(("regexp", rest)) => (DomainMatchType::Regexp, rest),
            _ => (DomainMatchType::Domain, s),
        };

        if value.is_empty() {
            return Err(ConfigError::InvalidDomainPattern(s.to_string()));
        }

        Ok(Self::new(match_type, value))
    }
}

impl fmt::Display for DomainPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.match_type.as_str(), self.value)
    }
}

/// Static host entry: every name matching the pattern resolves to `ips`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticHostConfig {
    #[serde(rename = "type", default)]
    pub match_type: DomainMatchType,

    pub domain: String,

    pub ips: Vec<IpAddr>,
}

impl StaticHostConfig {
    pub fn pattern(&self) -> DomainPattern {
        DomainPattern::new(self.match_type, &self.domain)
    }
}

/// Lowercase and strip the trailing root dot.
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}
