//! # Host Model
//!
//! The structured result of a resolution: one [`Host`] per responding
//! address, each carrying the [`Service`]s it advertised.

use std::collections::BTreeSet;
use std::net::IpAddr;

/// An ordered key/value set parsed from one TXT record.
///
/// Keys without `=` carry no value. Inserting an existing key replaces its
/// value but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, Option<String>)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key: String = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns `Some(None)` for a flag key and `None` when the key is absent.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A service instance advertised by a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Fully qualified instance name, e.g. `Office Printer._ipp._tcp.local.`.
    pub name: String,
    /// The service type it was advertised under, e.g. `_ipp._tcp.local.`.
    pub protocol: String,
    pub port: u16,
    pub ttl: u32,
    /// One entry per TXT record.
    pub properties: Vec<Properties>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// First discovered address, or the sender address when none was advertised.
    pub id: String,
    pub display_name: String,
    pub ips: BTreeSet<IpAddr>,
    pub services: Vec<Service>,
}

impl Host {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            ips: BTreeSet::new(),
            services: Vec::new(),
        }
    }

    pub fn add_service(&mut self, service: Service) {
        self.services.push(service);
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|service| service.name == name)
    }

    /// Whether any service was advertised under `protocol` (case-insensitive).
    pub fn advertises(&self, protocol: &str) -> bool {
        self.services
            .iter()
            .any(|service| service.protocol.eq_ignore_ascii_case(protocol))
    }

    pub fn get_primary_ip(&self) -> Option<IpAddr> {
        self.ips
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| self.ips.iter().next())
            .cloned()
    }
}
