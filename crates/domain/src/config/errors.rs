use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid name server address '{0}'")]
    InvalidServerAddress(String),

    #[error("Invalid domain pattern '{0}'")]
    InvalidDomainPattern(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}
