use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid DNS response: {0}")]
    InvalidDnsResponse(String),

    #[error("Record not found")]
    RecordNotFound,

    /// Upstream answered with a non-success response code.
    #[error("Resolution failed with response code {code}")]
    ResolutionFailed { code: u16 },

    #[error("Query timeout")]
    QueryTimeout,

    #[error("Query cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No name servers configured")]
    EmptyServerList,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DomainError {
    /// Numeric DNS response code for authoritative failures.
    pub fn rcode(&self) -> Option<u16> {
        match self {
            Self::ResolutionFailed { code } => Some(*code),
            _ => None,
        }
    }

    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::InvalidDnsResponse(_))
    }

    /// Ranking used when several servers failed: the highest one is reported.
    ///
    /// An authoritative response code beats a transport failure, which beats a
    /// plain timeout or an empty cache.
    pub fn specificity(&self) -> u8 {
        match self {
            Self::ResolutionFailed { .. } => 3,
            Self::Transport(_) | Self::InvalidDnsResponse(_) => 2,
            Self::QueryTimeout | Self::RecordNotFound | Self::Cancelled => 1,
            _ => 0,
        }
    }
}

impl From<crate::config::ConfigError> for DomainError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
