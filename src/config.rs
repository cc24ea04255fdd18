//! Configuration loading.
//!
//! Priority order for the file:
//! 1. Explicitly provided path
//! 2. `sinkhole.toml` in the current directory
//! 3. Built-in defaults
//!
//! Command-line overrides are applied on top of whichever was used.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "sinkhole.toml";

/// Port used for resolvers given as a bare IP address.
pub const DNS_PORT: u16 = 53;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address to bind the listener to
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    #[serde(default)]
    pub dns: DnsConfig,

    #[serde(default)]
    pub blocking: BlockingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsConfig {
    /// Upstream resolvers, `ip` or `ip:port`. Only the first is used.
    #[serde(default = "default_resolvers")]
    pub resolvers: Vec<String>,

    /// How long to wait for an upstream reply
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Include the category lists compiled into the binary
    #[serde(default = "default_true")]
    pub bundled: bool,

    /// Directory of plain list files, one domain per line
    #[serde(default)]
    pub lists_dir: Option<PathBuf>,

    #[serde(default)]
    pub blocked: Vec<String>,

    /// Domains never blocked, even when a list names them
    #[serde(default)]
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Options: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Seconds between stats lines; 0 disables them
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

/// Command-line overrides for configuration.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub bind: Option<IpAddr>,
    pub upstream: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn load(path: Option<&Path>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(overrides);
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.display().to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(bind) = overrides.bind {
            self.bind = bind;
        }
        if let Some(upstream) = overrides.upstream {
            self.dns.resolvers = vec![upstream];
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Validation("port cannot be 0".to_string()));
        }
        if self.dns.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "dns.timeout_ms cannot be 0".to_string(),
            ));
        }
        self.primary_resolver()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// The resolver queries are relayed to.
    pub fn primary_resolver(&self) -> Result<SocketAddr, ConfigError> {
        let first = self
            .dns
            .resolvers
            .first()
            .ok_or_else(|| ConfigError::Validation("no upstream resolvers configured".to_string()))?;
        parse_resolver(first)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.dns.timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            dns: DnsConfig::default(),
            blocking: BlockingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            resolvers: default_resolvers(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bundled: true,
            lists_dir: None,
            blocked: Vec::new(),
            allowed: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            stats_interval_secs: default_stats_interval(),
        }
    }
}

/// Accept `1.1.1.1`, `1.1.1.1:5353`, `2606:4700::1111` or `[::1]:5353`.
pub fn parse_resolver(value: &str) -> Result<SocketAddr, ConfigError> {
    let value = value.trim();
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Ok(addr);
    }
    value
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .map_err(|_| ConfigError::Validation(format!("invalid resolver address: {}", value)))
}

fn default_port() -> u16 {
    DNS_PORT
}

fn default_bind() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_resolvers() -> Vec<String> {
    vec!["1.1.1.1".to_string()]
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stats_interval() -> u64 {
    60
}
