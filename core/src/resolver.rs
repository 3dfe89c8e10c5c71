//! # Resolution Coordinator
//!
//! Drives one mDNS resolution: builds the query, serializes non-overlapped
//! resolutions process-wide, hands the query to the [`Transport`] and returns
//! whatever the [`ResponseAggregator`] collected.
//!
//! Cancellation is checked on entry, while waiting for the single-flight
//! lock and right after acquiring it; any of those fail with
//! [`ResolveError::Cancelled`]. Once the transport has started, cancelling
//! only shortens the scan and the partial result is returned.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::sync::{Arc, OnceLock};

use sonar_common::config::ResolveOptions;
use sonar_common::network::host::Host;
use sonar_protocols::dns::{self, DnsResponse, RecordData};
use sonar_protocols::mdns::SERVICES_META_QUERY;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::aggregator::{ResponseAggregator, ResponseCallback, ResponseMap};
use crate::announce::{self, AnnouncementCallback};
use crate::error::{ResolveError, Result};
use crate::host;
use crate::network::multicast::MulticastTransport;
use crate::network::transport::{PacketHandler, ScanRequest, Transport};
use crate::query::Query;

/// Receives hosts as their responses arrive. A host is reported again each
/// time another packet from it is merged.
pub type HostCallback = Arc<dyn Fn(&Host) + Send + Sync>;

static RESOLVE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Guards against more than one non-overlapped resolution in the process.
fn resolve_lock() -> &'static Mutex<()> {
    RESOLVE_LOCK.get_or_init(|| Mutex::new(()))
}

#[derive(Clone)]
pub struct Resolver {
    transport: Arc<dyn Transport>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Arc::new(MulticastTransport::new()))
    }
}

impl Resolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Runs one resolution and returns the merged response of every responder.
    ///
    /// An empty map is a valid outcome. `on_response` streams each accepted
    /// packet's merged response as it settles.
    pub async fn resolve(
        &self,
        options: &ResolveOptions,
        on_response: Option<ResponseCallback>,
        cancel: &CancellationToken,
    ) -> Result<ResponseMap> {
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }
        options.validate().map_err(ResolveError::InvalidOptions)?;

        let query: Query = Query::build(&options.protocols, options.query_kind)?;

        let _guard: Option<MutexGuard<'static, ()>> = if options.allow_overlapped_queries {
            None
        } else {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
                guard = resolve_lock().lock() => Some(guard),
            }
        };

        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        let aggregator: Arc<ResponseAggregator> = Arc::new(ResponseAggregator::new(on_response));
        let on_packet: PacketHandler = {
            let aggregator = aggregator.clone();
            Arc::new(move |source: IpAddr, bytes: &[u8]| {
                aggregator.ingest(source, bytes);
            })
        };

        let request = ScanRequest {
            query: query.into_bytes(),
            scan_time: options.scan_time,
            retries: options.retries,
            retry_delay: options.retry_delay,
            adapter: options.adapter.clone(),
        };

        info!(
            protocols = ?options.protocols,
            adapter = ?options.adapter,
            overlapped = options.allow_overlapped_queries,
            "starting resolution"
        );

        self.transport
            .send_and_collect(request, on_packet, cancel.clone())
            .await
            .map_err(ResolveError::Transport)?;

        let responses: ResponseMap = aggregator.take();
        info!(
            responders = responses.len(),
            cancelled = cancel.is_cancelled(),
            "resolution finished"
        );
        Ok(responses)
    }

    /// Resolves and projects the responses into hosts advertising at least
    /// one of the requested protocols.
    pub async fn resolve_hosts(
        &self,
        options: &ResolveOptions,
        on_host: Option<HostCallback>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Host>> {
        let protocols: Arc<Vec<String>> =
            Arc::new(options.protocols.iter().map(|p| dns::fqdn(p)).collect());

        let on_response: Option<ResponseCallback> = on_host.map(|callback| {
            let protocols = protocols.clone();
            Arc::new(move |source: IpAddr, response: &DnsResponse| {
                let host: Host = host::build_host(response, source);
                if advertises_any(&host, &protocols) {
                    callback(&host);
                }
            }) as ResponseCallback
        });

        let responses: ResponseMap = self.resolve(options, on_response, cancel).await?;

        let mut hosts: Vec<Host> = responses
            .iter()
            .map(|(source, response)| host::build_host(response, *source))
            .filter(|host| advertises_any(host, &protocols))
            .collect();
        hosts.sort_by(|a, b| {
            a.get_primary_ip()
                .cmp(&b.get_primary_ip())
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!(hosts = hosts.len(), "projected hosts");
        Ok(hosts)
    }

    /// Lists the service types advertised on the link, with the addresses
    /// advertising each. The protocols of `options` are replaced by the
    /// DNS-SD meta-query.
    pub async fn browse_domains(
        &self,
        options: &ResolveOptions,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<String, BTreeSet<IpAddr>>> {
        let options = ResolveOptions {
            protocols: vec![SERVICES_META_QUERY.to_string()],
            ..options.clone()
        };
        let responses: ResponseMap = self.resolve(&options, None, cancel).await?;

        let mut domains: BTreeMap<String, BTreeSet<IpAddr>> = BTreeMap::new();
        for (source, response) in &responses {
            for record in &response.answers {
                if !record.name.eq_ignore_ascii_case(SERVICES_META_QUERY) {
                    continue;
                }
                if let RecordData::Ptr(service_type) = &record.data {
                    domains
                        .entry(service_type.clone())
                        .or_default()
                        .insert(*source);
                }
            }
        }

        Ok(domains)
    }

    /// Passively reports every host announcing itself until `cancel` fires.
    pub async fn listen_for_announcements(
        &self,
        on_host: AnnouncementCallback,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        self.transport
            .listen_for_announcements(announce::announcement_handler(on_host), cancel.clone())
            .await
            .map_err(ResolveError::Transport)
    }
}

fn advertises_any(host: &Host, protocols: &[String]) -> bool {
    protocols.iter().any(|protocol| host.advertises(protocol))
}
