use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use colored::*;
use sonar_common::config::Config;
use sonar_common::network::host::Host;
use sonar_common::network::interface::AdapterInfo;
use sonar_core::Resolver;
use sonar_core::announce::AnnouncementCallback;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::mprint;
use crate::terminal::{colors, format, print};

pub async fn listen(cfg: &Config, cancel: &CancellationToken) -> anyhow::Result<()> {
    print::print_status("Press Ctrl-C to stop listening");

    let count = Arc::new(AtomicUsize::new(0));
    let on_host: AnnouncementCallback = {
        let count = count.clone();
        Arc::new(move |adapter: &AdapterInfo, host: &Host| {
            let idx = count.fetch_add(1, Ordering::Relaxed);
            let via = format!("via {adapter}").color(colors::SEPARATOR);
            print::tree_head(idx, &format!("{} {via}", host.display_name));
            print::as_tree_one_level(format::host_to_details(host));
            mprint!();
        })
    };

    Resolver::default()
        .listen_for_announcements(on_host, cancel)
        .await?;

    info!(announcements = count.load(Ordering::Relaxed), "listener stopped");
    if cfg.quiet == 0 {
        print::fat_separator();
    }
    Ok(())
}
