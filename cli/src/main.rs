mod commands;
mod terminal;

use commands::{CommandLine, Commands, browse, interfaces, listen, resolve};
use sonar_common::config::Config;
use terminal::{logging, print};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    let cfg = Config {
        quiet: commands.quiet,
        verbose: commands.verbose,
    };
    logging::init(&cfg);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    match commands.command {
        Commands::Resolve {
            protocols,
            any,
            scan,
        } => {
            print::header("resolving services", cfg.quiet);
            resolve::resolve(protocols, any, &scan, &cfg, &cancel).await
        }
        Commands::Browse { scan } => {
            print::header("browsing service types", cfg.quiet);
            browse::browse(&scan, &cfg, &cancel).await
        }
        Commands::Listen => {
            print::header("listening for announcements", cfg.quiet);
            listen::listen(&cfg, &cancel).await
        }
        Commands::Interfaces => {
            print::header("network adapters", cfg.quiet);
            interfaces::interfaces(&cfg);
            Ok(())
        }
    }
}
