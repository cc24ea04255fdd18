//! Transport layer for the DNS proxy.
//!
//! Receives DNS queries from clients and writes replies back. Only UDP is
//! served.

pub mod udp;

/// Maximum size of a DNS packet (with some headroom).
pub const MAX_DNS_PACKET_SIZE: usize = 4096;
