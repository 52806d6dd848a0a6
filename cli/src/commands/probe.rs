use std::time::{Duration, Instant};

use colored::*;
use culler_common::config::Config;
use culler_common::network::host::{Host, Partition};
use culler_core::{liveness, probe::select_probe};
use tracing::Instrument;

use crate::commands::HostArgs;
use crate::input;
use crate::terminal::{colors, format, print, spinner};

pub async fn probe(args: &HostArgs, cfg: &Config) -> anyhow::Result<()> {
    let hosts = input::collect_hosts(args)?;
    let probe = select_probe(cfg);

    let start_time: Instant = Instant::now();
    let span = spinner::phase(&format!("Probing {} hosts...", hosts.len()));
    let partition: Partition = liveness::resolve(&hosts, probe, cfg.max_tasks)
        .instrument(span)
        .await?;

    print_partition(&partition, cfg);
    print_summary(&partition, start_time.elapsed(), cfg);
    Ok(())
}

pub fn print_partition(partition: &Partition, cfg: &Config) {
    print::section("liveness", cfg.quiet);
    if cfg.quiet > 0 {
        return;
    }

    let fresh: Vec<&Host> = partition.fresh().iter().collect();
    let stale: Vec<&Host> = partition.stale().iter().collect();
    let key_width: usize = "Unresponsive".len();

    print::key_value("Responsive", key_width, format::hosts_to_value(&fresh, colors::FRESH));
    print::key_value("Unresponsive", key_width, format::hosts_to_value(&stale, colors::STALE));
}

fn print_summary(partition: &Partition, total_time: Duration, cfg: &Config) {
    let stale: ColoredString = format!("{} unresponsive", partition.stale().len())
        .bold()
        .color(colors::STALE);
    let total: ColoredString = format!("{} hosts", partition.len()).bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: String = format!("Probing Complete: {stale} of {total} in {total_time}");

    match cfg.quiet {
        0 => {
            print::rule();
            print::centered(&output);
        }
        _ => print::print(&output),
    }
}
