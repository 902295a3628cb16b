use hostcount_common::CapabilityError;
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostcountError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid frame on line {line}: {reason}")]
    InvalidFrame { line: usize, reason: String },

    #[error("Program rejected at load time: {0}")]
    CapabilityViolation(#[from] CapabilityError),

    #[error("Counting table is full ({capacity} entries), cannot seed {addr}")]
    TableFull { capacity: usize, addr: Ipv4Addr },

    #[error("Metrics error: {0}")]
    MetricsError(String),

    #[error("Replay worker failed: {0}")]
    ReplayFailed(String),
}

impl From<prometheus::Error> for HostcountError {
    fn from(e: prometheus::Error) -> Self {
        HostcountError::MetricsError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HostcountError>;
