use crate::dns::cache::IpRecord;
use ferrous_resolver_domain::DomainError;
use hickory_proto::op::{Header, Query, ResponseCode};
use hickory_proto::rr::{RData, Record};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder};
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// TTL used when an answer carries zero, and the upper bound for any answer.
pub const DEFAULT_TTL: u32 = 600;

pub struct ResponseParser;

impl ResponseParser {
    pub fn parse(response_bytes: &[u8]) -> Result<IpRecord, DomainError> {
        Self::parse_at(response_bytes, Instant::now())
    }

    /// Parse a response, computing expiry relative to `now`.
    ///
    /// Only a broken header fails the parse. A/AAAA answers accumulate in
    /// answer order; other types are skipped. A malformed question or answer
    /// stops the walk but keeps everything read so far.
    pub fn parse_at(response_bytes: &[u8], now: Instant) -> Result<IpRecord, DomainError> {
        let mut decoder = BinDecoder::new(response_bytes);
        let header = Header::read(&mut decoder).map_err(|e| {
            DomainError::InvalidDnsResponse(format!("Failed to parse DNS header: {}", e))
        })?;

        let answer_count = header.answer_count() as usize;
        let mut record = IpRecord {
            req_id: header.id(),
            ips: Vec::with_capacity(answer_count.min(8)),
            expire: now + Duration::from_secs(DEFAULT_TTL as u64),
            rcode: header.response_code(),
        };

        for _ in 0..header.query_count() {
            if let Err(e) = Query::read(&mut decoder) {
                warn!(id = record.req_id, error = %e, "Malformed question section");
                return Ok(record);
            }
        }

        for _ in 0..answer_count {
            let answer: Record = match Record::read(&mut decoder) {
                Ok(answer) => answer,
                Err(e) => {
                    warn!(id = record.req_id, error = %e, "Malformed answer, keeping partial result");
                    break;
                }
            };

            let ttl = match answer.ttl() {
                0 => DEFAULT_TTL,
                ttl => ttl,
            };
            let expire = now + Duration::from_secs(ttl as u64);
            if expire < record.expire {
                record.expire = expire;
            }

            match answer.data() {
                RData::A(a) => record.ips.push(IpAddr::V4(a.0)),
                RData::AAAA(aaaa) => record.ips.push(IpAddr::V6(aaaa.0)),
                _ => {}
            }
        }

        debug!(
            id = record.req_id,
            rcode = %rcode_to_status(record.rcode),
            addresses = record.ips.len(),
            "DNS response parsed"
        );

        Ok(record)
    }
}

pub fn rcode_to_status(rcode: ResponseCode) -> &'static str {
    match rcode {
        ResponseCode::NoError => "NOERROR",
        ResponseCode::NXDomain => "NXDOMAIN",
        ResponseCode::ServFail => "SERVFAIL",
        ResponseCode::Refused => "REFUSED",
        ResponseCode::NotImp => "NOTIMP",
        ResponseCode::FormErr => "FORMERR",
        _ => "UNKNOWN",
    }
}
