pub mod dns;
pub mod mdns;

#[cfg(any(test, feature = "test-util"))]
pub mod fixture;
