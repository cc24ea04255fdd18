//! Upstream relay.
//!
//! Each forwarded query gets its own ephemeral UDP socket and an entry in
//! the pending table keyed by `(transaction id, client)`. A reply is only
//! accepted if it comes from the resolver and carries the query's ID; any
//! other datagram is dropped and the wait continues until the deadline.
//! The pending entry and the socket are released together when the
//! forward finishes, whichever way it finishes.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

use crate::dns::{HEADER_LEN, transaction_id};
use crate::error::RelayError;
use crate::transport::MAX_DNS_PACKET_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PendingKey {
    id: u16,
    client: SocketAddr,
}

#[derive(Debug)]
struct PendingQuery {
    started: Instant,
    local: Option<SocketAddr>,
}

type PendingTable = Arc<Mutex<FxHashMap<PendingKey, PendingQuery>>>;

/// Removes its pending entry when dropped.
struct PendingGuard {
    table: PendingTable,
    key: PendingKey,
}

impl PendingGuard {
    fn register(table: &PendingTable, key: PendingKey) -> Option<Self> {
        let mut pending = table.lock().ok()?;
        if pending.contains_key(&key) {
            return None;
        }
        pending.insert(
            key,
            PendingQuery {
                started: Instant::now(),
                local: None,
            },
        );
        Some(Self {
            table: table.clone(),
            key,
        })
    }

    fn bind_local(&self, local: SocketAddr) {
        if let Ok(mut pending) = self.table.lock() {
            if let Some(entry) = pending.get_mut(&self.key) {
                entry.local = Some(local);
            }
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let Ok(mut pending) = self.table.lock() else {
            return;
        };
        if let Some(entry) = pending.remove(&self.key) {
            trace!(
                id = self.key.id,
                client = %self.key.client,
                local = ?entry.local,
                elapsed_ms = entry.started.elapsed().as_secs_f64() * 1000.0,
                "Released pending query"
            );
        }
    }
}

/// Forwards raw queries to a single upstream resolver.
pub struct UpstreamRelay {
    resolver: SocketAddr,
    timeout: Duration,
    pending: PendingTable,
}

impl UpstreamRelay {
    pub fn new(resolver: SocketAddr, timeout: Duration) -> Self {
        Self {
            resolver,
            timeout,
            pending: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    pub fn resolver(&self) -> SocketAddr {
        self.resolver
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of forwards currently awaiting a reply. Each one holds
    /// exactly one ephemeral socket.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Send `request` to the resolver and wait for the reply with the same
    /// transaction ID. The reply bytes are returned unmodified.
    pub async fn forward(&self, request: &[u8], client: SocketAddr) -> Result<Vec<u8>, RelayError> {
        let id = transaction_id(request).unwrap_or_default();
        let key = PendingKey { id, client };

        let Some(guard) = PendingGuard::register(&self.pending, key) else {
            return Err(RelayError::Duplicate { id, client });
        };

        let deadline = tokio::time::Instant::now() + self.timeout;
        let result = tokio::time::timeout_at(deadline, self.exchange(request, id, &guard)).await;
        drop(guard);

        match result {
            Ok(reply) => reply,
            Err(_) => Err(RelayError::Timeout {
                resolver: self.resolver,
                timeout: self.timeout,
            }),
        }
    }

    async fn exchange(&self, request: &[u8], id: u16, guard: &PendingGuard) -> Result<Vec<u8>, RelayError> {
        let bind_addr: SocketAddr = if self.resolver.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        guard.bind_local(socket.local_addr()?);

        let sent = socket.send_to(request, self.resolver).await?;
        debug!(id, resolver = %self.resolver, bytes_sent = sent, "Forwarded query upstream");

        let mut buf = vec![0u8; MAX_DNS_PACKET_SIZE];
        loop {
            let (len, from) = socket.recv_from(&mut buf).await?;

            if from != self.resolver {
                warn!(expected = %self.resolver, received_from = %from, "Discarding reply from unexpected source");
                continue;
            }
            if len < HEADER_LEN {
                warn!(len, "Discarding short upstream reply");
                continue;
            }
            if transaction_id(&buf[..len]) != Some(id) {
                debug!(id, got = ?transaction_id(&buf[..len]), "Discarding reply with mismatched ID");
                continue;
            }

            buf.truncate(len);
            return Ok(buf);
        }
    }
}
