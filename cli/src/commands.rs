pub mod browse;
pub mod interfaces;
pub mod listen;
pub mod resolve;

use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use sonar_common::config::ResolveOptions;

#[derive(Parser)]
#[command(name = "sonar")]
#[command(about = "Discover services advertised over multicast DNS.", version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Print less, repeat for even less
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,

    /// Log more, repeat for more detail
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve hosts offering one or more service types
    #[command(alias = "r")]
    Resolve {
        /// Service types, e.g. `_ipp._tcp.local.`
        #[arg(required = true)]
        protocols: Vec<String>,
        /// Ask for every record type instead of PTR only
        #[arg(long)]
        any: bool,
        #[command(flatten)]
        scan: ScanArgs,
    },
    /// List the service types advertised on the network
    #[command(alias = "b")]
    Browse {
        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Print hosts as they announce themselves, until Ctrl-C
    #[command(alias = "l")]
    Listen,
    /// Show the adapters mDNS queries can be sent from
    #[command(alias = "i")]
    Interfaces,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Listening window per query, in milliseconds
    #[arg(long, default_value_t = 2_000)]
    pub scan_time: u64,
    /// Extra queries sent when nobody answered
    #[arg(long, default_value_t = 2)]
    pub retries: u32,
    /// Pause before each extra query, in milliseconds
    #[arg(long, default_value_t = 2_000)]
    pub retry_delay: u64,
    /// Only use this network adapter
    #[arg(short, long)]
    pub interface: Option<String>,
    /// Run alongside other resolutions instead of waiting for them
    #[arg(long)]
    pub overlap: bool,
}

impl ScanArgs {
    pub fn apply(&self, options: ResolveOptions) -> ResolveOptions {
        let options = options
            .with_scan_time(Duration::from_millis(self.scan_time))
            .with_retries(self.retries)
            .with_retry_delay(Duration::from_millis(self.retry_delay))
            .with_overlap(self.overlap);

        match &self.interface {
            Some(name) => options.with_adapter(name.clone()),
            None => options,
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
