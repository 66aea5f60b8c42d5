//! DNS Message Builder
//!
//! Constructs A/AAAA query messages in wire format using `hickory-proto`,
//! optionally carrying an EDNS0 client-subnet option.

use ferrous_resolver_domain::{DomainError, IpOption};
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::opt::{ClientSubnet, EdnsOption};
use hickory_proto::rr::{Name, RecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use smallvec::{smallvec, SmallVec};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

/// UDP payload size advertised in the OPT pseudo-record.
pub const EDNS_UDP_PAYLOAD: u16 = 1350;

const IPV4_SUBNET_PREFIX: u8 = 24;
const IPV6_SUBNET_PREFIX: u8 = 96;

/// Public resolvers known to answer multi-question messages.
pub const MULTI_QUESTION_RESOLVERS: &[IpAddr] = &[
    IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
    IpAddr::V4(Ipv4Addr::new(8, 8, 4, 4)),
    IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
    IpAddr::V4(Ipv4Addr::new(1, 0, 0, 1)),
];

/// One outgoing query and the record types it asks for.
#[derive(Debug, Clone)]
pub struct QueryMessage {
    pub id: u16,
    pub domain: String,
    pub record_types: SmallVec<[RecordType; 2]>,
    pub message: Message,
}

impl QueryMessage {
    /// Serialize to wire format bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DomainError> {
        MessageBuilder::serialize_message(&self.message)
    }
}

/// Builds DNS query messages in wire format
pub struct MessageBuilder;

impl MessageBuilder {
    /// Build the queries needed to satisfy `option` for `domain`.
    ///
    /// One A query when IPv4 is enabled and one AAAA query when IPv6 is
    /// enabled, each with an id drawn from `next_id` and RD set. When
    /// `client_ip` is given, an EDNS0 client-subnet option is attached.
    pub fn build_queries<F>(
        domain: &str,
        option: IpOption,
        mut next_id: F,
        client_ip: Option<IpAddr>,
    ) -> Result<Vec<QueryMessage>, DomainError>
    where
        F: FnMut() -> u16,
    {
        if option.is_empty() {
            return Ok(Vec::new());
        }

        let fqdn = to_fqdn(domain);
        let name = Name::from_str(&fqdn).map_err(|e| {
            DomainError::InvalidDomainName(format!("Invalid domain '{}': {}", domain, e))
        })?;
        let edns = client_ip.map(client_subnet_edns);

        let mut types: SmallVec<[RecordType; 2]> = SmallVec::new();
        if option.ipv4_enabled {
            types.push(RecordType::A);
        }
        if option.ipv6_enabled {
            types.push(RecordType::AAAA);
        }

        Ok(types
            .into_iter()
            .map(|record_type| {
                let id = next_id();
                let mut message = Message::new(id, MessageType::Query, OpCode::Query);
                message.set_recursion_desired(true);
                message.add_query(Query::query(name.clone(), record_type));
                if let Some(ref edns) = edns {
                    message.set_edns(edns.clone());
                }
                QueryMessage {
                    id,
                    domain: fqdn.clone(),
                    record_types: smallvec![record_type],
                    message,
                }
            })
            .collect())
    }

    /// Merge an A and an AAAA query into one two-question message.
    ///
    /// Only for destinations passing [`supports_multi_question`]. The merged
    /// message keeps the id of the first query.
    pub fn coalesce(queries: Vec<QueryMessage>) -> Vec<QueryMessage> {
        if queries.len() != 2 {
            return queries;
        }

        let mut iter = queries.into_iter();
        let (Some(mut first), Some(second)) = (iter.next(), iter.next()) else {
            return Vec::new();
        };

        for query in second.message.queries() {
            first.message.add_query(query.clone());
        }
        first.record_types.extend(second.record_types);
        vec![first]
    }

    /// Serialize a Message to wire format bytes
    fn serialize_message(message: &Message) -> Result<Vec<u8>, DomainError> {
        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);

        message.emit(&mut encoder).map_err(|e| {
            DomainError::InvalidDomainName(format!("Failed to serialize DNS message: {}", e))
        })?;

        Ok(buf)
    }
}

pub fn supports_multi_question(server: SocketAddr, resolvers: &[IpAddr]) -> bool {
    resolvers.contains(&server.ip())
}

/// Append the root label if missing.
pub fn to_fqdn(domain: &str) -> String {
    if domain.ends_with('.') {
        domain.to_ascii_lowercase()
    } else {
        format!("{}.", domain.to_ascii_lowercase())
    }
}

/// Client subnet is sent as /24 for IPv4 and /96 for IPv6, with host bits
/// cleared. Only the bytes covering the prefix go on the wire.
fn client_subnet_edns(client_ip: IpAddr) -> Edns {
    let (address, prefix) = mask_client_ip(client_ip);

    let mut edns = Edns::new();
    edns.set_max_payload(EDNS_UDP_PAYLOAD);
    edns.options_mut()
        .insert(EdnsOption::Subnet(ClientSubnet::new(address, prefix, 0)));
    edns
}

fn mask_client_ip(client_ip: IpAddr) -> (IpAddr, u8) {
    match client_ip {
        IpAddr::V4(v4) => {
            let mask = u32::MAX << (32 - IPV4_SUBNET_PREFIX as u32);
            (
                IpAddr::V4(Ipv4Addr::from(u32::from(v4) & mask)),
                IPV4_SUBNET_PREFIX,
            )
        }
        IpAddr::V6(v6) => {
            let mask = u128::MAX << (128 - IPV6_SUBNET_PREFIX as u32);
            (
                IpAddr::V6(Ipv6Addr::from(u128::from(v6) & mask)),
                IPV6_SUBNET_PREFIX,
            )
        }
    }
}
