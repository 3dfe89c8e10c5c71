use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv6Addr};

use colored::*;
use sonar_common::network::host::{Host, Properties, Service};

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

pub fn ipv6_to_type_str(ipv6_addr: &Ipv6Addr) -> &'static str {
    let first_byte: u8 = ipv6_addr.octets()[0];
    if (0x20..=0x3F).contains(&first_byte) {
        return "GUA";
    }
    if ipv6_addr.is_unique_local() {
        return "ULA";
    }
    if ipv6_addr.is_unicast_link_local() {
        return "LLA";
    }
    "IPv6"
}

pub fn ip_to_detail(ips: &BTreeSet<IpAddr>) -> Vec<Detail> {
    ips.iter()
        .map(|ip| match ip {
            IpAddr::V4(ipv4_addr) => {
                let value = ipv4_addr.to_string().color(colors::IPV4_ADDR);
                (String::from("IPv4"), value)
            }
            IpAddr::V6(ipv6_addr) => {
                let ipv6_type = ipv6_to_type_str(ipv6_addr);
                let ipv6_addr = ipv6_addr.to_string().color(colors::IPV6_ADDR);
                (String::from(ipv6_type), ipv6_addr)
            }
        })
        .collect()
}

/// Renders one TXT property set as `key=value, flag`.
pub fn properties_to_string(properties: &Properties) -> String {
    properties
        .iter()
        .map(|(key, value)| match value {
            Some(value) => format!("{key}={value}"),
            None => key.to_string(),
        })
        .collect::<Vec<String>>()
        .join(", ")
}

pub fn service_to_details(service: &Service) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![
        ("Service".to_string(), service.name.color(colors::SERVICE).bold()),
        ("Type".to_string(), service.protocol.normal()),
        ("Port".to_string(), service.port.to_string().color(colors::ACCENT)),
        ("TTL".to_string(), format!("{}s", service.ttl).normal()),
    ];

    for properties in service.properties.iter().filter(|set| !set.is_empty()) {
        details.push(("TXT".to_string(), properties_to_string(properties).dimmed()));
    }

    details
}

pub fn host_to_details(host: &Host) -> Vec<Detail> {
    let mut details: Vec<Detail> = ip_to_detail(&host.ips);
    if host.ips.is_empty() {
        details.push(("Sender".to_string(), host.id.color(colors::IPV4_ADDR)));
    }
    for service in &host.services {
        details.extend(service_to_details(service));
    }
    details
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
