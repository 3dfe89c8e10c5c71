//! # Response Aggregation
//!
//! Collects the packets of one resolution attempt into a single logical
//! response per sender address.
//!
//! Ingestion may be called concurrently from every adapter's receive loop.
//! All mutation happens under one mutex, held only for a single packet.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};

use sonar_protocols::dns::{self, DnsResponse};
use tracing::{debug, trace};

/// Final result of a resolution, one merged response per sender.
pub type ResponseMap = HashMap<IpAddr, DnsResponse>;

/// Invoked with the merged response every time a packet is accepted.
///
/// Runs while the aggregation lock is held, so calls for the same address
/// arrive in ingestion order. Keep it short.
pub type ResponseCallback = Arc<dyn Fn(IpAddr, &DnsResponse) + Send + Sync>;

/// What happened to an accepted packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    pub address: IpAddr,
    /// The merged response after this packet.
    pub response: DnsResponse,
    /// `true` when this was the first packet from `address`.
    pub is_new: bool,
}

#[derive(Default)]
pub struct ResponseAggregator {
    responses: Mutex<ResponseMap>,
    on_response: Option<ResponseCallback>,
}

impl ResponseAggregator {
    pub fn new(on_response: Option<ResponseCallback>) -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            on_response,
        }
    }

    /// Decodes and merges one packet received from `source`.
    ///
    /// Returns `None` when the packet is dropped: it failed to decode, it is
    /// a query rather than a reply, or it advertises an address other than
    /// its sender.
    pub fn ingest(&self, source: IpAddr, bytes: &[u8]) -> Option<Ingested> {
        let response: DnsResponse = match dns::decode(bytes) {
            Ok(response) => response,
            Err(e) => {
                trace!(%source, error = %e, "dropping undecodable packet");
                return None;
            }
        };

        self.ingest_response(source, response)
    }

    /// Merges an already decoded packet. Same rules as [`Self::ingest`].
    pub fn ingest_response(&self, source: IpAddr, response: DnsResponse) -> Option<Ingested> {
        if !response.header.is_response {
            trace!(%source, "ignoring query echo");
            return None;
        }

        if !is_from_advertised_address(&response, source) {
            trace!(%source, "dropping packet relayed from another address");
            return None;
        }

        let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);

        let (merged, is_new): (&DnsResponse, bool) = match responses.entry(source) {
            Entry::Vacant(slot) => (&*slot.insert(response), true),
            Entry::Occupied(slot) => {
                let existing: &mut DnsResponse = slot.into_mut();
                existing.answers.extend(response.answers);
                (&*existing, false)
            }
        };

        debug!(
            %source,
            is_new,
            answers = merged.answers.len(),
            "accepted mDNS response"
        );

        if let Some(callback) = &self.on_response {
            callback(source, merged);
        }

        Some(Ingested {
            address: source,
            response: merged.clone(),
            is_new,
        })
    }

    pub fn len(&self) -> usize {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves the collected responses out, leaving the aggregator empty.
    pub fn take(&self) -> ResponseMap {
        std::mem::take(&mut *self.responses.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Every A record must name the sender. A packet without A records cannot
/// be checked and is accepted.
fn is_from_advertised_address(response: &DnsResponse, source: IpAddr) -> bool {
    response.a_records().all(|addr| IpAddr::V4(addr) == source)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
