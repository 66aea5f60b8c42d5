use ferrous_resolver_domain::IpOption;
use ferrous_resolver_infrastructure::dns::forwarding::{MessageBuilder, ResponseParser, DEFAULT_TTL};
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::{Duration, Instant};

mod helpers;
use helpers::ip;

fn a_response(id: u16, answers: &[(Ipv4Addr, u32)]) -> Vec<u8> {
    let name = Name::from_str("dns.google.").unwrap();
    let mut message = Message::new(id, MessageType::Response, OpCode::Query);
    for (addr, ttl) in answers {
        message.add_answer(Record::from_rdata(name.clone(), *ttl, RData::A(A(*addr))));
    }
    message.to_vec().unwrap()
}

#[test]
fn test_header_only_response() {
    let now = Instant::now();
    let record = ResponseParser::parse_at(&a_response(0, &[]), now).unwrap();

    assert_eq!(record.req_id, 0);
    assert!(record.ips.is_empty());
    assert_eq!(record.rcode, ResponseCode::NoError);
    assert_eq!(record.expire, now + Duration::from_secs(DEFAULT_TTL as u64));
}

#[test]
fn test_two_a_answers_in_order() {
    let bytes = a_response(
        1,
        &[(Ipv4Addr::new(8, 8, 8, 8), 300), (Ipv4Addr::new(8, 8, 4, 4), 300)],
    );
    let record = ResponseParser::parse(&bytes).unwrap();

    assert_eq!(record.req_id, 1);
    assert_eq!(record.ips, vec![ip("8.8.8.8"), ip("8.8.4.4")]);
    assert_eq!(record.rcode, ResponseCode::NoError);
}

#[test]
fn test_query_ids_come_from_generator() {
    let mut next = 40_000u16;
    let queries = MessageBuilder::build_queries(
        "example.com",
        IpOption::BOTH,
        || {
            next += 1;
            next
        },
        None,
    )
    .unwrap();

    assert_eq!(queries.len(), 2);
    for query in &queries {
        let decoded = Message::from_vec(&query.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.id(), query.id);
        assert!(decoded.recursion_desired());
        assert_eq!(decoded.queries().len(), 1);
        assert_eq!(decoded.queries()[0].name().to_ascii(), "example.com.");
    }
    assert_eq!(queries[0].id, 40_001);
    assert_eq!(queries[1].id, 40_002);
}

#[test]
fn test_query_record_types_follow_option() {
    let ipv6 = MessageBuilder::build_queries("a.com", IpOption::IPV6_ONLY, || 7, None).unwrap();
    assert_eq!(ipv6.len(), 1);
    assert_eq!(ipv6[0].record_types.as_slice(), &[RecordType::AAAA]);

    let none = MessageBuilder::build_queries("a.com", IpOption::NONE, || 7, None).unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_response_to_built_query_keeps_id() {
    let queries =
        MessageBuilder::build_queries("a.com", IpOption::IPV4_ONLY, || 4242, None).unwrap();
    let query = Message::from_vec(&queries[0].to_bytes().unwrap()).unwrap();

    let mut response = Message::new(query.id(), MessageType::Response, OpCode::Query);
    response.add_query(query.queries()[0].clone());
    response.add_answer(Record::from_rdata(
        query.queries()[0].name().clone(),
        30,
        RData::A(A(Ipv4Addr::new(192, 0, 2, 1))),
    ));

    let record = ResponseParser::parse(&response.to_vec().unwrap()).unwrap();
    assert_eq!(record.req_id, 4242);
    assert_eq!(record.ips, vec![ip("192.0.2.1")]);
}

#[test]
fn test_garbage_rejected() {
    assert!(ResponseParser::parse(&[0x12, 0x34, 0x81]).is_err());
}
