//! The network transport used by the resolver.
//!
//! A [`Transport`] owns sockets, per-adapter parallelism and retry timing.
//! The resolver only hands it an encoded query and a packet handler.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sonar_common::network::interface::AdapterInfo;
use tokio_util::sync::CancellationToken;

/// Called for every datagram received during a scan, from any adapter task.
pub type PacketHandler = Arc<dyn Fn(IpAddr, &[u8]) + Send + Sync>;

/// Called for every datagram received while listening passively.
pub type AnnouncementHandler = Arc<dyn Fn(&AdapterInfo, IpAddr, &[u8]) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub query: Vec<u8>,
    pub scan_time: Duration,
    /// Extra sends while nobody has answered yet, spaced by `retry_delay`.
    pub retries: u32,
    pub retry_delay: Duration,
    /// Restricts the scan to one adapter; `None` uses every usable adapter.
    pub adapter: Option<String>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request.query` and feeds every reply into `on_packet` until
    /// `request.scan_time` has elapsed. Retries happen inside that window.
    ///
    /// Cancellation ends the scan early and still returns `Ok`.
    async fn send_and_collect(
        &self,
        request: ScanRequest,
        on_packet: PacketHandler,
        cancel: CancellationToken,
    ) -> anyhow::Result<()>;

    /// Receives unsolicited mDNS traffic on every usable adapter until cancelled.
    async fn listen_for_announcements(
        &self,
        on_announcement: AnnouncementHandler,
        cancel: CancellationToken,
    ) -> anyhow::Result<()>;
}
