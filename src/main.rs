use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sinkhole::Config;
use sinkhole::config::CliOverrides;

#[derive(Parser)]
#[command(name = "sinkhole")]
#[command(about = "DNS forwarding proxy that refuses blocklisted domains", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Local port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// Upstream resolver (ip or ip:port)
    #[arg(short, long)]
    upstream: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let overrides = CliOverrides {
        port: args.port,
        bind: args.bind,
        upstream: args.upstream,
        log_level: args.log_level,
    };
    let config = Config::load(args.config.as_deref(), overrides)?;

    init_logging(&config.logging.level);
    info!("Starting sinkhole v{}", env!("CARGO_PKG_VERSION"));

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    if let Err(e) = rt.block_on(sinkhole::proxy::run(config)) {
        error!("DNS proxy stopped: {:#}", e);
        return Err(e);
    }

    Ok(())
}
