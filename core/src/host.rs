//! # Host Projection
//!
//! Turns one aggregated response into a [`Host`] with its [`Service`]s.
//!
//! A PTR answer only becomes a service when an SRV record for its target is
//! present among the answers or additionals. TXT records found for the same
//! target become property sets.

use std::net::{IpAddr, Ipv4Addr};

use sonar_common::network::host::{Host, Properties, Service};
use sonar_protocols::dns::{DnsResponse, Record, RecordData};

/// Projects `response`, falling back to `remote` when it advertises no address.
pub fn build_host(response: &DnsResponse, remote: IpAddr) -> Host {
    let addresses: Vec<Ipv4Addr> = distinct_addresses(response);

    let id: String = addresses
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| remote.to_string());

    let display_name: String = response
        .answers
        .iter()
        .find(|record| record.a().is_some())
        .map(|record| record.name.clone())
        .unwrap_or_else(|| remote.to_string());

    let mut host = Host::new(id, display_name);
    host.ips.extend(addresses.into_iter().map(IpAddr::V4));

    for record in &response.answers {
        let RecordData::Ptr(target) = &record.data else {
            continue;
        };
        if host.service(target).is_some() {
            continue;
        }
        if let Some(service) = build_service(response, &record.name, target) {
            host.add_service(service);
        }
    }

    host
}

/// Parses the strings of one TXT record.
///
/// Each string splits on its first `=`. A string without `=` becomes a flag
/// with no value, unless it is blank.
pub fn parse_properties<S: AsRef<str>>(strings: &[S]) -> Properties {
    let mut properties = Properties::new();

    for entry in strings {
        let entry: &str = entry.as_ref();
        match entry.split_once('=') {
            Some((key, value)) => properties.insert(key, Some(value.to_string())),
            None if entry.trim().is_empty() => {}
            None => properties.insert(entry, None),
        }
    }

    properties
}

fn build_service(response: &DnsResponse, protocol: &str, target: &str) -> Option<Service> {
    let matched: Vec<&Record> = response
        .records()
        .filter(|record| record.name.eq_ignore_ascii_case(target))
        .collect();

    let (port, ttl): (u16, u32) = matched.iter().find_map(|record| match record.data {
        RecordData::Srv { port, .. } => Some((port, record.ttl)),
        _ => None,
    })?;

    let mut properties: Vec<Properties> = Vec::new();
    for record in &matched {
        if let RecordData::Txt(strings) = &record.data {
            let set: Properties = parse_properties(strings);
            // Merged retries repeat the same TXT record.
            if !properties.contains(&set) {
                properties.push(set);
            }
        }
    }

    Some(Service {
        name: target.to_string(),
        protocol: protocol.to_string(),
        port,
        ttl,
        properties,
    })
}

fn distinct_addresses(response: &DnsResponse) -> Vec<Ipv4Addr> {
    let mut addresses: Vec<Ipv4Addr> = Vec::new();
    for addr in response.a_records() {
        if !addresses.contains(&addr) {
            addresses.push(addr);
        }
    }
    addresses
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
