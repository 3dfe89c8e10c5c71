//! mDNS service discovery engine.
//!
//! [`Resolver`] sends a query over one or every multicast adapter, merges the
//! replies per sender with [`aggregator::ResponseAggregator`] and projects
//! them into [`Host`](sonar_common::network::host::Host)s with
//! [`host::build_host`].

pub mod aggregator;
pub mod announce;
pub mod error;
pub mod host;
pub mod network;
pub mod query;
pub mod resolver;

pub use aggregator::{ResponseCallback, ResponseMap};
pub use error::{ResolveError, Result};
pub use resolver::{HostCallback, Resolver};
