//! Error types for Dirauth

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Unknown LDAP mode: {0}")]
    UnknownMode(String),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "InvalidConfig",
            Error::ConfigRead { .. } => "ConfigRead",
            Error::ConfigParse(_) => "ConfigParse",
            Error::UnknownMode(_) => "InvalidConfig",
        }
    }
}
