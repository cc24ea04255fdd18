//! Query processing pipeline.
//!
//! 1. Decode the question name
//! 2. Check it against the blocklist
//! 3. Refuse it, or relay it upstream
//!
//! Transports handle the actual I/O, the processor handles decisions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::dns::{HEADER_LEN, QueryType, decode_name, make_refused};
use crate::error::ParseError;
use crate::filter::DomainFilter;
use crate::relay::UpstreamRelay;
use crate::stats::{Stats, StatsSnapshot};

/// Action to take for a DNS query.
#[derive(Debug, PartialEq, Eq)]
pub enum QueryAction {
    /// Query is blocked, return this response immediately.
    Refuse { response: Vec<u8>, domain: String },
    /// Query should be forwarded to upstream.
    Forward { domain: String },
}

pub struct RequestProcessor {
    filter: Arc<dyn DomainFilter>,
    relay: UpstreamRelay,
    stats: Stats,
}

impl RequestProcessor {
    pub fn new(filter: Arc<dyn DomainFilter>, relay: UpstreamRelay) -> Self {
        Self {
            filter,
            relay,
            stats: Stats::new(),
        }
    }

    /// Decide what to do with a raw query without doing any I/O.
    pub fn classify(&self, query: &[u8]) -> Result<QueryAction, ParseError> {
        if query.len() < HEADER_LEN {
            return Err(ParseError::TooShort { len: query.len() });
        }

        let (domain, consumed) = decode_name(query, HEADER_LEN)?;

        if self.filter.contains(&domain) {
            return Ok(QueryAction::Refuse {
                response: make_refused(query),
                domain,
            });
        }

        let qtype = QueryType::read(query, HEADER_LEN + consumed);
        debug!(domain = %domain, qtype = ?qtype, "Received query");

        Ok(QueryAction::Forward { domain })
    }

    /// Produce the reply for `query`, if there is one.
    ///
    /// Parse failures are returned so the caller can drop the datagram.
    /// A failed relay yields `Ok(None)`: the client gets no answer and
    /// retries on its own.
    pub async fn process(
        &self,
        query: &[u8],
        client: SocketAddr,
    ) -> Result<Option<Vec<u8>>, ParseError> {
        let start_time = Instant::now();

        let action = match self.classify(query) {
            Ok(action) => action,
            Err(e) => {
                self.stats.record_dropped();
                return Err(e);
            }
        };

        match action {
            QueryAction::Refuse { response, domain } => {
                let elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0;
                self.stats.record_refused(elapsed_ms);
                info!(domain = %domain, client = %client, "Blocking domain");
                Ok(Some(response))
            }
            QueryAction::Forward { domain } => match self.relay.forward(query, client).await {
                Ok(reply) => {
                    let elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0;
                    self.stats.record_forwarded(elapsed_ms);
                    debug!(
                        domain = %domain,
                        client = %client,
                        total_ms = elapsed_ms,
                        "Forwarded"
                    );
                    Ok(Some(reply))
                }
                Err(e) => {
                    self.stats.record_failed();
                    warn!(domain = %domain, client = %client, error = %e, "Relay failed, no reply sent");
                    Ok(None)
                }
            },
        }
    }

    pub fn relay(&self) -> &UpstreamRelay {
        &self.relay
    }

    pub fn stats_snapshot_and_reset(&self) -> StatsSnapshot {
        self.stats.snapshot_and_reset()
    }
}
