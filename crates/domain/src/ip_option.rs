use std::net::IpAddr;

/// Address families a caller wants back from a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IpOption {
    pub ipv4_enabled: bool,
    pub ipv6_enabled: bool,
}

impl IpOption {
    pub const BOTH: Self = Self::new(true, true);
    pub const IPV4_ONLY: Self = Self::new(true, false);
    pub const IPV6_ONLY: Self = Self::new(false, true);
    pub const NONE: Self = Self::new(false, false);

    pub const fn new(ipv4_enabled: bool, ipv6_enabled: bool) -> Self {
        Self {
            ipv4_enabled,
            ipv6_enabled,
        }
    }

    /// True when neither family is requested.
    pub fn is_empty(&self) -> bool {
        !self.ipv4_enabled && !self.ipv6_enabled
    }

    pub fn accepts(&self, ip: &IpAddr) -> bool {
        match ip {
            IpAddr::V4(_) => self.ipv4_enabled,
            IpAddr::V6(_) => self.ipv6_enabled,
        }
    }

    /// Keeps only the addresses of requested families, preserving order.
    pub fn filter(&self, ips: &[IpAddr]) -> Vec<IpAddr> {
        ips.iter().copied().filter(|ip| self.accepts(ip)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_keeps_order() {
        let ips: Vec<IpAddr> = vec![
            "1.1.1.1".parse().unwrap(),
            "::1".parse().unwrap(),
            "8.8.8.8".parse().unwrap(),
        ];

        assert_eq!(
            IpOption::IPV4_ONLY.filter(&ips),
            vec![ips[0], ips[2]]
        );
        assert_eq!(IpOption::IPV6_ONLY.filter(&ips), vec![ips[1]]);
        assert_eq!(IpOption::BOTH.filter(&ips), ips);
        assert!(IpOption::NONE.filter(&ips).is_empty());
    }

    #[test]
    fn test_is_empty() {
        assert!(IpOption::NONE.is_empty());
        assert!(IpOption::default().is_empty());
        assert!(!IpOption::IPV4_ONLY.is_empty());
    }
}
