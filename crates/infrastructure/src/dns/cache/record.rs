use ferrous_resolver_domain::DomainError;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::RecordType;
use std::net::IpAddr;
use std::time::Instant;

/// One answer set for a single query type of one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpRecord {
    /// Message id of the response this record came from.
    pub req_id: u16,
    pub ips: Vec<IpAddr>,
    pub expire: Instant,
    pub rcode: ResponseCode,
}

impl IpRecord {
    /// A record is usable while `now` is strictly before its expiry.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expire <= now
    }

    /// Addresses, or the authoritative failure carried by the record.
    ///
    /// An empty successful record yields `RecordNotFound`.
    pub fn addresses(&self) -> Result<&[IpAddr], DomainError> {
        if self.rcode != ResponseCode::NoError {
            return Err(DomainError::ResolutionFailed {
                code: u16::from(self.rcode),
            });
        }
        if self.ips.is_empty() {
            return Err(DomainError::RecordNotFound);
        }
        Ok(&self.ips)
    }

    /// Copy restricted to the address family matching `record_type`.
    ///
    /// Used to split the answer to a coalesced A+AAAA message.
    pub fn for_record_type(&self, record_type: RecordType) -> Self {
        let ips = self
            .ips
            .iter()
            .copied()
            .filter(|ip| match record_type {
                RecordType::A => ip.is_ipv4(),
                RecordType::AAAA => ip.is_ipv6(),
                _ => false,
            })
            .collect();
        Self {
            req_id: self.req_id,
            ips,
            expire: self.expire,
            rcode: self.rcode,
        }
    }
}

/// A and AAAA answers for one fully-qualified domain.
#[derive(Debug, Clone, Default)]
pub struct DomainRecord {
    pub a: Option<IpRecord>,
    pub aaaa: Option<IpRecord>,
}

impl DomainRecord {
    pub fn slot_mut(&mut self, record_type: RecordType) -> Option<&mut Option<IpRecord>> {
        match record_type {
            RecordType::A => Some(&mut self.a),
            RecordType::AAAA => Some(&mut self.aaaa),
            _ => None,
        }
    }

    /// Drop expired answers. Returns true when nothing is left.
    pub fn purge_expired(&mut self, now: Instant) -> bool {
        if self.a.as_ref().is_some_and(|r| r.is_expired(now)) {
            self.a = None;
        }
        if self.aaaa.as_ref().is_some_and(|r| r.is_expired(now)) {
            self.aaaa = None;
        }
        self.a.is_none() && self.aaaa.is_none()
    }
}
