mod commands;
mod input;
mod terminal;

use commands::{CommandLine, Commands, find, probe, purge};
use terminal::{logging, print};
use tracing::error;

#[tokio::main]
async fn main() {
    let commands = CommandLine::parse_args();

    logging::init(commands.quiet);
    let cfg = commands.config();
    print::banner(cfg.quiet);

    let result: anyhow::Result<()> = match &commands.command {
        Commands::Probe { hosts } => {
            print::section("probing hosts", cfg.quiet);
            probe::probe(hosts, &cfg).await
        }
        Commands::Find { hosts, store } => {
            print::section("looking for stale objects", cfg.quiet);
            find::find(hosts, store, &cfg).await
        }
        Commands::Purge {
            hosts,
            store,
            scope,
            output,
            ..
        } => {
            print::section("getting ready for cleanup", cfg.quiet);
            purge::purge(hosts, store, scope, output.as_deref(), &cfg).await
        }
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}
