//! Error types shared across the proxy.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// A datagram that cannot be interpreted as a DNS query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("message too short: {len} bytes, need at least 12")]
    TooShort { len: usize },

    #[error("no name data at offset {offset}")]
    Empty { offset: usize },

    #[error("label at offset {offset} runs past end of message")]
    Truncated { offset: usize },

    #[error("compression pointer at offset {offset} not supported in question name")]
    CompressionPointer { offset: usize },
}

/// Failure to obtain a matching reply from the upstream resolver.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no reply from {resolver} within {timeout:?}")]
    Timeout {
        resolver: SocketAddr,
        timeout: Duration,
    },

    #[error("query {id:#06x} from {client} is already in flight")]
    Duplicate { id: u16, client: SocketAddr },

    #[error("upstream I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    FileRead(String, String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("configuration validation error: {0}")]
    Validation(String),
}
