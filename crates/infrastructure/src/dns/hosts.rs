use super::matcher::DomainMatcherGroup;
use ferrous_resolver_domain::config::{DnsConfig, DomainMatchType, DomainPattern, StaticHostConfig};
use ferrous_resolver_domain::ConfigError;
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::{info, warn};

/// Fixed domain → address table consulted before any name server.
///
/// Built once and never mutated, so lookups need no locking.
pub struct StaticHosts {
    matcher: DomainMatcherGroup,
    /// Addresses by matcher id (`id - 1`).
    ips: Vec<Vec<IpAddr>>,
}

impl StaticHosts {
    pub fn from_config(config: &DnsConfig) -> Result<Self, ConfigError> {
        Self::new(&config.hosts, &config.static_hosts)
    }

    /// Legacy `domain → ip` pairs go in first as exact matches, sorted by
    /// domain. Pairs whose value is not an IP address are skipped with a
    /// warning. Rich entries follow in order, so later entries take
    /// precedence when several patterns match.
    pub fn new(
        legacy: &HashMap<String, String>,
        entries: &[StaticHostConfig],
    ) -> Result<Self, ConfigError> {
        let mut builder = DomainMatcherGroup::builder();
        let mut ips = Vec::with_capacity(legacy.len() + entries.len());

        let mut legacy: Vec<_> = legacy.iter().collect();
        legacy.sort_unstable_by(|a, b| a.0.cmp(b.0));

        for (domain, value) in legacy {
            let Ok(ip) = value.trim().parse::<IpAddr>() else {
                warn!(
                    domain = %domain,
                    value = %value,
                    "Static host must map to an IP address, entry ignored"
                );
                continue;
            };
            builder.add(&DomainPattern::new(DomainMatchType::Full, domain.as_str()))?;
            ips.push(vec![ip]);
        }

        for entry in entries {
            if entry.ips.is_empty() {
                warn!(domain = %entry.domain, "Static host without addresses, entry ignored");
                continue;
            }
            builder.add(&entry.pattern())?;
            ips.push(entry.ips.clone());
        }

        let matcher = builder.build()?;
        if !ips.is_empty() {
            info!(entries = ips.len(), "Static hosts loaded");
        }

        Ok(Self { matcher, ips })
    }

    pub fn empty() -> Self {
        Self {
            matcher: DomainMatcherGroup::default(),
            ips: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.ips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ips.is_empty()
    }

    /// Addresses of the highest-priority entry matching `domain`.
    pub fn lookup(&self, domain: &str) -> Option<&[IpAddr]> {
        let id = self.matcher.best_match(domain)?;
        self.ips.get(id as usize - 1).map(Vec::as_slice)
    }
}
