pub mod multicast;
pub mod transport;
