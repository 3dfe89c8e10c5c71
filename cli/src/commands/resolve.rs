use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use colored::*;
use sonar_common::config::{Config, QueryKind, ResolveOptions};
use sonar_common::network::host::Host;
use sonar_core::{HostCallback, ResolveError, Resolver};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span, warn};

use crate::commands::ScanArgs;
use crate::mprint;
use crate::terminal::{colors, format, print, spinner};

pub async fn resolve(
    protocols: Vec<String>,
    any: bool,
    scan: &ScanArgs,
    cfg: &Config,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let kind = if any { QueryKind::Any } else { QueryKind::Ptr };
    let options: ResolveOptions = scan.apply(ResolveOptions::new(protocols).with_query_kind(kind));
    options.validate().map_err(anyhow::Error::msg)?;

    spinner::start("Waiting for responders...", cfg.quiet);
    let seen: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
    let on_host: HostCallback = {
        let seen = seen.clone();
        Arc::new(move |host: &Host| {
            let mut seen = seen.lock().unwrap_or_else(PoisonError::into_inner);
            if seen.insert(host.id.clone()) {
                spinner::report_progress("hosts found", seen.len());
            }
        })
    };

    let start_time: Instant = Instant::now();
    let result = Resolver::default()
        .resolve_hosts(&options, Some(on_host), cancel)
        .instrument(info_span!("resolve", protocols = ?options.protocols))
        .await;
    spinner::finish();

    let hosts: Vec<Host> = match result {
        Ok(hosts) => hosts,
        Err(ResolveError::Cancelled) => {
            warn!("resolution cancelled before it started");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    resolve_ends(&hosts, start_time.elapsed(), cfg);
    Ok(())
}

fn resolve_ends(hosts: &[Host], total_time: Duration, cfg: &Config) {
    if hosts.is_empty() {
        print::header("zero hosts responded", cfg.quiet);
        print::no_results();
        return;
    }

    print::header("resolved hosts", cfg.quiet);
    for (idx, host) in hosts.iter().enumerate() {
        print::tree_head(idx, &host.display_name);
        print::as_tree_one_level(format::host_to_details(host));
        if idx + 1 != hosts.len() {
            mprint!();
        }
    }
    print_summary(hosts, total_time, cfg);
}

fn print_summary(hosts: &[Host], total_time: Duration, cfg: &Config) {
    let services: usize = hosts.iter().map(|host| host.services.len()).sum();
    let host_count: ColoredString = format!("{} hosts", hosts.len()).bold().green();
    let service_count: ColoredString = format!("{services} services").bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: String = format!(
        "{} {host_count} offering {service_count} in {total_time}",
        "Resolved".color(colors::TEXT_DEFAULT)
    );

    match cfg.quiet {
        0 => {
            print::fat_separator();
            print::centerln(&output);
        }
        _ => print::print_status(&output),
    }
}
