//! End-to-end tests over loopback: client socket -> listener -> relay ->
//! mock upstream and back.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use rand::Rng;
use tokio::net::UdpSocket;

use sinkhole::config::Config;
use sinkhole::dns::{HEADER_LEN, Header, Rcode, build_query, decode_name, transaction_id};
use sinkhole::filter::{Blocklist, BlocklistSnapshot};
use sinkhole::proxy::build_blocklist;
use sinkhole::transport::udp::UdpTransport;
use sinkhole::{RequestProcessor, UpstreamRelay};

struct Proxy {
    addr: SocketAddr,
    processor: Arc<RequestProcessor>,
}

async fn start_proxy(blocklist: Blocklist, resolver: SocketAddr, timeout: Duration) -> Proxy {
    let relay = UpstreamRelay::new(resolver, timeout);
    let processor = Arc::new(RequestProcessor::new(Arc::new(blocklist), relay));

    let udp = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = udp.local_addr().unwrap();
    udp.start(processor.clone());

    Proxy { addr, processor }
}

/// Send one query from a fresh client socket and wait for a reply.
async fn ask(proxy: SocketAddr, query: &[u8], wait: Duration) -> Option<Vec<u8>> {
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(query, proxy).await.unwrap();

    let mut buf = [0u8; 4096];
    match tokio::time::timeout(wait, client.recv_from(&mut buf)).await {
        Ok(Ok((len, _))) => Some(buf[..len].to_vec()),
        _ => None,
    }
}

/// An upstream that answers every query by echoing it with QR set, after
/// a random delay, unless the name starts with "slow".
async fn spawn_echo_upstream(max_jitter_ms: u64) -> SocketAddr {
    let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                continue;
            };
            let query = buf[..len].to_vec();
            let Ok((domain, _)) = decode_name(&query, HEADER_LEN) else {
                continue;
            };
            if domain.starts_with("slow") {
                continue;
            }

            let delay = rand::rng().random_range(0..=max_jitter_ms);
            let socket = socket.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                let mut reply = query;
                reply[2] |= 0x80;
                reply[3] |= 0x80;
                let _ = socket.send_to(&reply, from).await;
            });
        }
    });

    addr
}

fn unused_resolver() -> SocketAddr {
    "127.0.0.1:9".parse().unwrap()
}

#[tokio::test]
async fn blocked_domain_is_refused() {
    let proxy = start_proxy(
        build_blocklist(&Config::default()),
        unused_resolver(),
        Duration::from_secs(1),
    )
    .await;
    let query = build_query(0x1357, "doubleclick.net", 1);

    let reply = ask(proxy.addr, &query, Duration::from_secs(2)).await.unwrap();

    let header = Header::parse(&reply).unwrap();
    assert_eq!(header.id, 0x1357);
    assert!(header.flags.qr);
    assert_eq!(header.flags.rcode, Rcode::Refused as u8);
    assert_eq!(reply.len(), query.len());
    assert_eq!(reply[4..], query[4..]);
    assert_eq!(proxy.processor.relay().in_flight(), 0);
}

#[tokio::test]
async fn unblocked_domain_gets_upstream_bytes_verbatim() {
    let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr = upstream.local_addr().unwrap();
    let proxy = start_proxy(
        build_blocklist(&Config::default()),
        upstream_addr,
        Duration::from_secs(2),
    )
    .await;
    let query = build_query(0x2468, "example.com", 1);

    let canned = tokio::spawn(async move {
        let mut buf = [0u8; 512];
        let (len, from) = upstream.recv_from(&mut buf).await.unwrap();
        assert_eq!(transaction_id(&buf[..len]), Some(0x2468));

        let mut answer = [0x5Au8; 40];
        answer[0..2].copy_from_slice(&buf[0..2]);
        answer[2] = 0x81;
        answer[3] = 0x80;
        upstream.send_to(&answer, from).await.unwrap();
        answer
    });

    let reply = ask(proxy.addr, &query, Duration::from_secs(3)).await.unwrap();

    let answer = canned.await.unwrap();
    assert_eq!(reply.len(), 40);
    assert_eq!(reply, answer);
}

#[tokio::test]
async fn short_datagram_gets_no_reply_and_listener_survives() {
    let proxy = start_proxy(
        Blocklist::new(BlocklistSnapshot::new(["doubleclick.net"])),
        unused_resolver(),
        Duration::from_secs(1),
    )
    .await;

    let reply = ask(proxy.addr, &[0x12, 0x34, 0x01, 0x00, 0x00], Duration::from_millis(200)).await;
    assert!(reply.is_none());

    let query = build_query(99, "doubleclick.net", 1);
    let reply = ask(proxy.addr, &query, Duration::from_secs(2)).await;
    assert_eq!(reply.as_deref().and_then(transaction_id), Some(99));

    let stats = proxy.processor.stats_snapshot_and_reset();
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.refused, 1);
}

#[tokio::test]
async fn malformed_name_gets_no_reply() {
    let proxy = start_proxy(Blocklist::empty(), unused_resolver(), Duration::from_secs(1)).await;
    let mut query = build_query(5, "example.com", 1);
    query[HEADER_LEN] = 0xC0; // compression pointer where the name starts

    assert!(ask(proxy.addr, &query, Duration::from_millis(200)).await.is_none());
    assert_eq!(proxy.processor.relay().in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queries_get_their_own_replies() {
    let upstream = spawn_echo_upstream(30).await;
    let proxy = start_proxy(Blocklist::empty(), upstream, Duration::from_secs(5)).await;

    let tasks = (0..100u16).map(|i| {
        let addr = proxy.addr;
        tokio::spawn(async move {
            let domain = format!("host{}.example", i);
            let query = build_query(i, &domain, 1);
            let reply = ask(addr, &query, Duration::from_secs(5)).await;
            (i, domain, reply)
        })
    });

    for result in join_all(tasks).await {
        let (id, domain, reply) = result.unwrap();
        let reply = reply.unwrap_or_else(|| panic!("no reply for {}", domain));

        assert_eq!(transaction_id(&reply), Some(id));
        assert_eq!(decode_name(&reply, HEADER_LEN).unwrap().0, domain);
        assert!(Header::parse(&reply).unwrap().flags.qr);
    }

    assert_eq!(proxy.processor.relay().in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn silent_upstream_times_out_without_stalling_others() {
    let upstream = spawn_echo_upstream(0).await;
    let timeout = Duration::from_millis(400);
    let proxy = start_proxy(Blocklist::empty(), upstream, timeout).await;

    let slow = {
        let addr = proxy.addr;
        tokio::spawn(async move {
            let query = build_query(1, "slow.example", 1);
            ask(addr, &query, Duration::from_millis(900)).await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(proxy.processor.relay().in_flight(), 1);

    let started = Instant::now();
    let fast = ask(proxy.addr, &build_query(2, "fast.example", 1), Duration::from_secs(2)).await;
    assert_eq!(fast.as_deref().and_then(transaction_id), Some(2));
    assert!(started.elapsed() < timeout);

    assert!(slow.await.unwrap().is_none());
    assert_eq!(proxy.processor.relay().in_flight(), 0);
    assert_eq!(proxy.processor.stats_snapshot_and_reset().failed, 1);
}
