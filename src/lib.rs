//! Sinkhole - a DNS forwarding proxy that refuses blocklisted domains.
//!
//! This library exposes the pipeline pieces for the binary, benchmarks and
//! integration tests.

pub mod config;
pub mod dns;
pub mod error;
pub mod filter;
pub mod processor;
pub mod proxy;
pub mod relay;
pub mod stats;
pub mod transport;

pub use config::Config;
pub use error::{ConfigError, ParseError, RelayError};
pub use processor::{QueryAction, RequestProcessor};
pub use relay::UpstreamRelay;
