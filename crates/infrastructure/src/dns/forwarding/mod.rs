pub mod message_builder;
pub mod response_parser;

pub use message_builder::{MessageBuilder, QueryMessage, EDNS_UDP_PAYLOAD, MULTI_QUESTION_RESOLVERS};
pub use response_parser::{ResponseParser, DEFAULT_TTL};
