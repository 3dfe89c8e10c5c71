use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use colored::*;
use sonar_common::config::{Config, ResolveOptions};
use sonar_core::{ResolveError, Resolver};
use sonar_protocols::mdns::SERVICES_META_QUERY;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::commands::ScanArgs;
use crate::terminal::{colors, format, print, spinner};

pub async fn browse(scan: &ScanArgs, cfg: &Config, cancel: &CancellationToken) -> anyhow::Result<()> {
    let options: ResolveOptions = scan.apply(ResolveOptions::new([SERVICES_META_QUERY]));

    spinner::start("Asking for advertised service types...", cfg.quiet);
    let result = Resolver::default().browse_domains(&options, cancel).await;
    spinner::finish();

    let domains: BTreeMap<String, BTreeSet<IpAddr>> = match result {
        Ok(domains) => domains,
        Err(ResolveError::Cancelled) => {
            warn!("browse cancelled before it started");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if domains.is_empty() {
        print::no_results();
        return Ok(());
    }

    for (idx, (service_type, sources)) in domains.iter().enumerate() {
        print::tree_head(idx, service_type);
        print::as_tree_one_level(format::ip_to_detail(sources));
    }

    if cfg.quiet == 0 {
        print::fat_separator();
        let summary = format!(
            "{} {} service types",
            "Found".color(colors::TEXT_DEFAULT),
            domains.len().to_string().bold().green()
        );
        print::centerln(&summary);
    }
    Ok(())
}
