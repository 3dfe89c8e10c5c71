//! UDP multicast transport, one socket per adapter.
//!
//! Every socket binds `0.0.0.0:5353` with address reuse and joins
//! `224.0.0.251` on its own adapter, so each one can also see traffic that
//! arrived through a sibling adapter. The resolver filters those echoes.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use anyhow::{Context, ensure};
use async_trait::async_trait;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use sonar_common::network::interface::{self, AdapterInfo};
use sonar_protocols::mdns::{self, MDNS_IPV4, MDNS_PORT};
use tokio::net::UdpSocket;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::transport::{AnnouncementHandler, PacketHandler, ScanRequest, Transport};

const RECV_BUFFER_SIZE: usize = 9_000;
const MULTICAST_TTL: u32 = 255;

#[derive(Debug, Default, Clone, Copy)]
pub struct MulticastTransport;

impl MulticastTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for MulticastTransport {
    async fn send_and_collect(
        &self,
        request: ScanRequest,
        on_packet: PacketHandler,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let adapters: Vec<AdapterInfo> = resolve_adapters(request.adapter.as_deref())?;
        let local: Arc<HashSet<IpAddr>> = Arc::new(
            adapters
                .iter()
                .map(|adapter| IpAddr::V4(adapter.ipv4))
                .collect(),
        );
        info!(adapters = adapters.len(), "sending mDNS query");

        let request: Arc<ScanRequest> = Arc::new(request);
        let mut tasks: JoinSet<anyhow::Result<()>> = JoinSet::new();
        for adapter in adapters {
            tasks.spawn(scan_adapter(
                adapter,
                request.clone(),
                on_packet.clone(),
                local.clone(),
                cancel.clone(),
            ));
        }

        join_adapter_tasks(tasks).await
    }

    async fn listen_for_announcements(
        &self,
        on_announcement: AnnouncementHandler,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let adapters: Vec<AdapterInfo> = resolve_adapters(None)?;
        info!(adapters = adapters.len(), "listening for mDNS announcements");

        let mut tasks: JoinSet<anyhow::Result<()>> = JoinSet::new();
        for adapter in adapters {
            tasks.spawn(listen_adapter(adapter, on_announcement.clone(), cancel.clone()));
        }

        join_adapter_tasks(tasks).await
    }
}

/// Opens an mDNS socket joined to the multicast group on `adapter`.
pub fn bind_adapter(adapter: &AdapterInfo) -> anyhow::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .context("creating UDP socket")?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, MDNS_PORT);
    socket
        .bind(&SockAddr::from(bind_addr))
        .with_context(|| format!("binding {bind_addr} for {adapter}"))?;
    socket
        .join_multicast_v4(&MDNS_IPV4, &adapter.ipv4)
        .with_context(|| format!("joining {MDNS_IPV4} on {adapter}"))?;
    socket.set_multicast_if_v4(&adapter.ipv4)?;
    socket.set_multicast_ttl_v4(MULTICAST_TTL)?;
    socket.set_nonblocking(true)?;

    let socket = UdpSocket::from_std(socket.into()).context("registering socket with tokio")?;
    Ok(socket)
}

fn resolve_adapters(forced: Option<&str>) -> anyhow::Result<Vec<AdapterInfo>> {
    match forced {
        Some(name) => {
            let adapter: AdapterInfo = interface::find_adapter(name)
                .with_context(|| format!("adapter '{name}' not found or has no IPv4 address"))?;
            Ok(vec![adapter])
        }
        None => {
            let adapters: Vec<AdapterInfo> = interface::get_multicast_adapters();
            ensure!(!adapters.is_empty(), "no multicast-capable adapters available");
            Ok(adapters)
        }
    }
}

async fn scan_adapter(
    adapter: AdapterInfo,
    request: Arc<ScanRequest>,
    on_packet: PacketHandler,
    local: Arc<HashSet<IpAddr>>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let socket: UdpSocket = bind_adapter(&adapter)?;
    let replies: usize = collect_window(&socket, &adapter, &request, &on_packet, &local, &cancel).await?;
    debug!(%adapter, replies, "scan window closed");
    Ok(())
}

/// The socket operations a scan needs.
#[async_trait]
trait ScanSocket: Send + Sync {
    async fn send_query(&self, query: &[u8]) -> std::io::Result<()>;
    async fn recv_packet(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)>;
}

#[async_trait]
impl ScanSocket for UdpSocket {
    async fn send_query(&self, query: &[u8]) -> std::io::Result<()> {
        self.send_to(query, mdns::multicast_socket_addr()).await.map(|_| ())
    }

    async fn recv_packet(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)> {
        self.recv_from(buf).await
    }
}

/// Sends the query and collects replies until `scan_time` after the first
/// send. While no foreign address has replied, the query is re-sent every
/// `retry_delay`, at most `retries` times, as long as the window is open.
///
/// Returns the number of foreign replies seen.
async fn collect_window<S: ScanSocket + ?Sized>(
    socket: &S,
    adapter: &AdapterInfo,
    request: &ScanRequest,
    on_packet: &PacketHandler,
    local: &HashSet<IpAddr>,
    cancel: &CancellationToken,
) -> anyhow::Result<usize> {
    let window = tokio::time::sleep(request.scan_time);
    tokio::pin!(window);

    socket
        .send_query(&request.query)
        .await
        .with_context(|| format!("sending query on {adapter}"))?;
    debug!(%adapter, "query sent");

    let resend = tokio::time::sleep(request.retry_delay);
    tokio::pin!(resend);
    let mut retries_left: u32 = request.retries;
    let mut replies: usize = 0;
    let mut buf: Vec<u8> = vec![0u8; RECV_BUFFER_SIZE];

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = &mut window => break,

            _ = &mut resend, if replies == 0 && retries_left > 0 => {
                socket
                    .send_query(&request.query)
                    .await
                    .with_context(|| format!("re-sending query on {adapter}"))?;
                retries_left -= 1;
                debug!(%adapter, retries_left, "no replies yet, query re-sent");
                resend.as_mut().reset(Instant::now() + request.retry_delay);
            }

            received = socket.recv_packet(&mut buf) => {
                let (len, source) = received
                    .with_context(|| format!("receiving on {adapter}"))?;
                if !local.contains(&source.ip()) {
                    replies += 1;
                }
                on_packet(source.ip(), &buf[..len]);
            }
        }
    }

    Ok(replies)
}

async fn listen_adapter(
    adapter: AdapterInfo,
    on_announcement: AnnouncementHandler,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let socket: UdpSocket = bind_adapter(&adapter)?;
    let mut buf: Vec<u8> = vec![0u8; RECV_BUFFER_SIZE];

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => return Ok(()),

            received = socket.recv_from(&mut buf) => {
                let (len, source) = received
                    .with_context(|| format!("receiving on {adapter}"))?;
                on_announcement(&adapter, source.ip(), &buf[..len]);
            }
        }
    }
}

/// Waits for every adapter task. Failed adapters are skipped unless all of them failed.
async fn join_adapter_tasks(mut tasks: JoinSet<anyhow::Result<()>>) -> anyhow::Result<()> {
    let mut first_failure: Option<anyhow::Error> = None;
    let mut succeeded: usize = 0;

    while let Some(joined) = tasks.join_next().await {
        match joined.context("adapter task panicked").and_then(|result| result) {
            Ok(()) => succeeded += 1,
            Err(e) => {
                warn!(error = ?e, "skipping adapter");
                first_failure.get_or_insert(e);
            }
        }
    }

    match first_failure {
        Some(e) if succeeded == 0 => Err(e),
        _ => Ok(()),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
