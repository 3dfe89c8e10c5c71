//! Passive announcement listening.

use std::net::IpAddr;
use std::sync::Arc;

use sonar_common::network::host::Host;
use sonar_common::network::interface::AdapterInfo;
use sonar_protocols::dns::{self, DnsResponse};
use tracing::trace;

use crate::host;
use crate::network::transport::AnnouncementHandler;

/// Receives each announcing host together with the adapter it arrived on.
pub type AnnouncementCallback = Arc<dyn Fn(&AdapterInfo, &Host) + Send + Sync>;

/// Wraps `on_host` into a raw packet handler: queries and undecodable
/// packets are skipped, every response is projected into a [`Host`].
pub fn announcement_handler(on_host: AnnouncementCallback) -> AnnouncementHandler {
    Arc::new(move |adapter: &AdapterInfo, source: IpAddr, bytes: &[u8]| {
        let response: DnsResponse = match dns::decode(bytes) {
            Ok(response) if response.header.is_response => response,
            Ok(_) => return,
            Err(e) => {
                trace!(%source, error = %e, "dropping undecodable announcement");
                return;
            }
        };

        on_host(adapter, &host::build_host(&response, source));
    })
}
