pub mod find;
pub mod probe;
pub mod purge;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use culler_common::config::{self, Config, ProbeSettings};
use culler_common::policy::grouping::Scope;

#[derive(Parser)]
#[command(name = "culler")]
#[command(about = "Finds decommissioned hosts and cleans them out of a policy store.")]
#[command(version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Print less (-q drops headers and trees, -qq prints only warnings and the summary)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Probe with TCP handshakes even when raw sockets are available
    #[arg(long, global = true)]
    pub tcp: bool,

    /// Echo requests sent to each host
    #[arg(long, global = true, default_value_t = config::DEFAULT_PROBE_COUNT,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub count: u16,

    /// Seconds to wait for a host to answer
    #[arg(long, global = true, value_name = "SECS", default_value_t = config::DEFAULT_PROBE_TIMEOUT.as_secs(),
          value_parser = clap::value_parser!(u64).range(1..=config::MAX_PROBE_TIMEOUT_SECS))]
    pub timeout: u64,

    /// Ports tried by TCP handshake probes
    #[arg(long, global = true, value_delimiter = ',', default_values_t = config::DEFAULT_TCP_PORTS)]
    pub ports: Vec<u16>,

    /// Upper bound on concurrent tasks in every phase
    #[arg(long, global = true, value_name = "N")]
    pub max_tasks: Option<usize>,
}

#[derive(Args)]
pub struct HostArgs {
    /// Hosts to check, separated by commas or spaces
    #[arg(value_delimiter = ',')]
    pub hosts: Vec<String>,

    /// CSV or text file with one host per row (first column)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

#[derive(Args)]
pub struct StoreArgs {
    /// JSON snapshot of the policy store
    #[arg(short, long, value_name = "SNAPSHOT")]
    pub store: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe hosts and report which ones stopped answering
    #[command(alias = "p")]
    Probe {
        #[command(flatten)]
        hosts: HostArgs,
    },
    /// List the address objects that belong to unresponsive hosts
    #[command(alias = "f")]
    Find {
        #[command(flatten)]
        hosts: HostArgs,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Remove objects of unresponsive hosts and every reference to them
    #[command(alias = "x")]
    Purge {
        #[command(flatten)]
        hosts: HostArgs,
        #[command(flatten)]
        store: StoreArgs,
        /// Grouping to clean, or "all"
        #[arg(long, default_value = "all")]
        scope: Scope,
        /// Where to write the cleaned snapshot (defaults to the input snapshot)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
        /// Show what would be removed without changing anything
        #[arg(long)]
        dry_run: bool,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config(&self) -> Config {
        let (dry_run, assume_yes) = match &self.command {
            Commands::Purge { dry_run, yes, .. } => (*dry_run, *yes),
            _ => (true, false),
        };

        Config {
            quiet: self.quiet,
            probe: ProbeSettings {
                count: self.count,
                timeout: Duration::from_secs(self.timeout),
                tcp_ports: self.ports.clone(),
            },
            max_tasks: self.max_tasks,
            force_tcp: self.tcp,
            dry_run,
            assume_yes,
        }
    }
}
