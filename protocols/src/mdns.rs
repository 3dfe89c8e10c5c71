use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

pub const MDNS_PORT: u16 = 5353;
pub const MDNS_IPV4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// Meta-query listing every service type on the link (RFC 6763, section 9).
pub const SERVICES_META_QUERY: &str = "_services._dns-sd._udp.local.";

pub fn multicast_socket_addr() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(MDNS_IPV4, MDNS_PORT))
}
