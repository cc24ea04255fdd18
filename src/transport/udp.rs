//! UDP listener for DNS queries.
//!
//! The receive loop only reads datagrams. Each one is handed to its own
//! task, so a query waiting on the upstream never holds up the others.
//! Replies go out on the same socket to whichever endpoint sent the query.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::processor::RequestProcessor;

use super::MAX_DNS_PACKET_SIZE;

/// UDP transport for the DNS proxy.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind the listening socket. Failure here must abort startup.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;

        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Start the receive loop on the current runtime.
    pub fn start(self, processor: Arc<RequestProcessor>) -> JoinHandle<()> {
        tokio::spawn(run(self.socket, processor))
    }
}

async fn run(socket: Arc<UdpSocket>, processor: Arc<RequestProcessor>) {
    let mut buf = [0u8; MAX_DNS_PACKET_SIZE];

    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                // ICMP port unreachable from a previous reply shows up here
                // on some platforms.
                warn!(error = %e, "UDP recv error");
                continue;
            }
        };

        let query = buf[..len].to_vec();
        tokio::spawn(handle_query(socket.clone(), processor.clone(), query, src));
    }
}

async fn handle_query(
    socket: Arc<UdpSocket>,
    processor: Arc<RequestProcessor>,
    query: Vec<u8>,
    src: SocketAddr,
) {
    let reply = match processor.process(&query, src).await {
        Ok(Some(reply)) => reply,
        Ok(None) => return,
        Err(e) => {
            debug!(client = %src, len = query.len(), error = %e, "Dropping malformed query");
            return;
        }
    };

    match socket.send_to(&reply, src).await {
        Ok(sent) => trace!(client = %src, bytes_sent = sent, "Reply sent"),
        Err(e) => warn!(client = %src, error = %e, "UDP response error"),
    }
}
