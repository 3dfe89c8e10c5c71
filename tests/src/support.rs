use std::net::{IpAddr, Ipv4Addr};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sonar_common::network::interface::AdapterInfo;
use sonar_core::network::transport::{AnnouncementHandler, PacketHandler, ScanRequest, Transport};
use sonar_protocols::dns::{Record, RecordData};
use sonar_protocols::fixture::PacketBuilder;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub type Packet = (IpAddr, Vec<u8>);

/// What the transport does once every adapter has replayed its packets.
#[derive(Debug, Clone)]
pub enum Behavior {
    Finish,
    /// Keeps the scan open this long, or until cancelled.
    Hold(Duration),
    WaitForCancel,
    Fail(String),
}

/// Replays canned packets as if they arrived on several adapters at once.
pub struct ReplayTransport {
    adapters: Vec<Vec<Packet>>,
    announcements: Vec<(AdapterInfo, Packet)>,
    behavior: Behavior,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<ScanRequest>>,
}

impl ReplayTransport {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
            announcements: Vec::new(),
            behavior: Behavior::Finish,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn adapter(mut self, packets: Vec<Packet>) -> Self {
        self.adapters.push(packets);
        self
    }

    pub fn announcement(mut self, adapter: AdapterInfo, packet: Packet) -> Self {
        self.announcements.push((adapter, packet));
        self
    }

    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ScanRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for ReplayTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn send_and_collect(
        &self,
        request: ScanRequest,
        on_packet: PacketHandler,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        if let Behavior::Fail(reason) = &self.behavior {
            anyhow::bail!("{reason}");
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let mut tasks: JoinSet<()> = JoinSet::new();
        for packets in self.adapters.clone() {
            let on_packet = on_packet.clone();
            tasks.spawn(async move {
                for (source, bytes) in packets {
                    on_packet(source, &bytes);
                    tokio::task::yield_now().await;
                }
            });
        }
        while tasks.join_next().await.is_some() {}

        match &self.behavior {
            Behavior::Hold(duration) => {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(*duration) => {}
                }
            }
            Behavior::WaitForCancel => cancel.cancelled().await,
            Behavior::Finish | Behavior::Fail(_) => {}
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn listen_for_announcements(
        &self,
        on_announcement: AnnouncementHandler,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        for (adapter, (source, bytes)) in &self.announcements {
            on_announcement(adapter, *source, bytes);
        }
        cancel.cancelled().await;
        Ok(())
    }
}

pub fn ip(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(a, b, c, d))
}

pub fn adapter(name: &str, ipv4: Ipv4Addr) -> AdapterInfo {
    AdapterInfo {
        name: name.to_string(),
        index: 1,
        ipv4,
    }
}

/// A complete DNS-SD answer for one instance: PTR answer, SRV, TXT and A.
pub fn service_response(protocol: &str, instance: &str, target: &str, address: Ipv4Addr, port: u16) -> Vec<u8> {
    let full_name = format!("{instance}.{protocol}");
    PacketBuilder::response()
        .answer(Record::new(protocol, 4500, RecordData::Ptr(full_name.clone())))
        .additional(Record::new(
            full_name.as_str(),
            120,
            RecordData::Srv {
                priority: 0,
                weight: 0,
                port,
                target: target.to_string(),
            },
        ))
        .additional(Record::new(
            full_name.as_str(),
            4500,
            RecordData::Txt(vec!["txtvers=1".to_string()]),
        ))
        .additional(Record::new(target, 120, RecordData::A(address)))
        .build()
}

/// A reply to the DNS-SD meta-query listing `service_types`.
pub fn services_response(service_types: &[&str]) -> Vec<u8> {
    service_types
        .iter()
        .fold(PacketBuilder::response(), |builder, service_type| {
            builder.answer(Record::new(
                sonar_protocols::mdns::SERVICES_META_QUERY,
                4500,
                RecordData::Ptr(service_type.to_string()),
            ))
        })
        .build()
}
