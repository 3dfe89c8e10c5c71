//! # Adapter Enumeration
//!
//! Picks the network adapters a multicast query can be sent from.

use std::fmt;
use std::net::Ipv4Addr;

use pnet::datalink::{self, NetworkInterface};
use thiserror::Error;
use tracing::debug;

use crate::utils::interface::NetworkInterfaceExtension;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    #[error("down")]
    IsDown,
    /// Loopback traffic never reaches other hosts.
    #[error("loopback")]
    IsLoopback,
    #[error("no multicast")]
    NotMulticast,
    /// The interface has no IPv4 address to join `224.0.0.251` on.
    #[error("no IPv4 address")]
    NoIpv4,
}

/// A network adapter usable for mDNS.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdapterInfo {
    pub name: String,
    pub index: u32,
    pub ipv4: Ipv4Addr,
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.ipv4)
    }
}

impl AdapterInfo {
    pub fn from_interface(interface: &NetworkInterface) -> Option<Self> {
        Some(Self {
            name: interface.name.clone(),
            index: interface.index,
            ipv4: interface.get_ipv4_addr()?,
        })
    }
}

/// Returns every adapter that can send and receive IPv4 multicast.
pub fn get_multicast_adapters() -> Vec<AdapterInfo> {
    select_multicast_adapters(&datalink::interfaces())
}

/// Looks up a single adapter by name, regardless of whether it is viable.
pub fn find_adapter(name: &str) -> Option<AdapterInfo> {
    datalink::interfaces()
        .iter()
        .find(|interface| interface.name == name)
        .and_then(AdapterInfo::from_interface)
}

pub fn select_multicast_adapters(interfaces: &[NetworkInterface]) -> Vec<AdapterInfo> {
    interfaces
        .iter()
        .filter(|interface| match is_viable_multicast_interface(interface) {
            Ok(()) => true,
            Err(reason) => {
                debug!(interface = %interface.name, %reason, "skipping adapter");
                false
            }
        })
        .filter_map(AdapterInfo::from_interface)
        .collect()
}

pub fn is_viable_multicast_interface(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    if !interface.is_multicast() {
        return Err(ViabilityError::NotMulticast);
    }
    if interface.get_ipv4_addr().is_none() {
        return Err(ViabilityError::NoIpv4);
    }

    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
