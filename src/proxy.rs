//! DNS proxy orchestration.
//!
//! Assembles the blocklist, relay and processor from configuration, binds
//! the listener and runs until shut down.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::Config;
use crate::filter::{
    Blocklist, Category, ListEntry, ListStore, MemoryListStore, bundled, load_list_dir,
};
use crate::processor::RequestProcessor;
use crate::relay::UpstreamRelay;
use crate::transport::udp::UdpTransport;

/// Fill a store from every list source the configuration names.
///
/// An unreadable list directory is logged and skipped so the proxy still
/// starts with whatever else is available.
pub fn populate_store(config: &Config, store: &dyn ListStore) {
    let blocking = &config.blocking;

    if blocking.bundled {
        let written = store.bulk_upsert(bundled::entries());
        info!(domains = written, "Loaded bundled lists");
    }

    if let Some(dir) = &blocking.lists_dir {
        match load_list_dir(dir) {
            Ok(domains) => {
                let entries = domains
                    .into_iter()
                    .map(|d| ListEntry::block(d, Category::Mixed))
                    .collect();
                let written = store.bulk_upsert(entries);
                info!(dir = %dir.display(), domains = written, "Loaded list files");
            }
            Err(e) => warn!(dir = %dir.display(), error = %e, "Could not read list directory"),
        }
    }

    store.bulk_upsert(
        blocking
            .blocked
            .iter()
            .map(|d| ListEntry::block(d.as_str(), Category::Mixed))
            .collect(),
    );
    store.bulk_upsert(
        blocking
            .allowed
            .iter()
            .map(|d| ListEntry::allow(d.as_str(), Category::Mixed))
            .collect(),
    );
}

/// Build the blocklist described by `config`.
pub fn build_blocklist(config: &Config) -> Blocklist {
    let blocklist = Blocklist::empty();
    if !config.blocking.enabled {
        info!("Blocking disabled, every query is forwarded");
        return blocklist;
    }

    let store = MemoryListStore::new();
    populate_store(config, &store);
    blocklist.refresh(&store);
    blocklist
}

/// Run the DNS proxy with the given configuration.
///
/// Returns an error if the listener cannot be bound. Otherwise runs until
/// Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let resolver = config.primary_resolver()?;
    let blocklist = Arc::new(build_blocklist(&config));
    let blocked_count = blocklist.len();

    let relay = UpstreamRelay::new(resolver, config.upstream_timeout());
    let processor = Arc::new(RequestProcessor::new(blocklist, relay));

    let listen_addr = config.listen_addr();
    let udp = UdpTransport::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind DNS listener on {}", listen_addr))?;

    info!(
        listen = %listen_addr,
        resolver = %resolver,
        blocked_domains = blocked_count,
        timeout_ms = config.dns.timeout_ms,
        "DNS proxy listening"
    );

    let listener = udp.start(processor.clone());

    if config.logging.stats_interval_secs > 0 {
        let period = Duration::from_secs(config.logging.stats_interval_secs);
        tokio::spawn(report_stats(processor.clone(), period));
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Shutting down");
    listener.abort();

    Ok(())
}

async fn report_stats(processor: Arc<RequestProcessor>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // Skip first immediate tick
    loop {
        interval.tick().await;
        let stats = processor.stats_snapshot_and_reset();
        info!(
            uptime_secs = stats.uptime_secs,
            requests = stats.requests,
            forwarded = stats.forwarded,
            refused = stats.refused,
            dropped = stats.dropped,
            failed = stats.failed,
            in_flight = processor.relay().in_flight(),
            avg_response_ms = stats.avg_response_ms,
            "Stats"
        );
    }
}
