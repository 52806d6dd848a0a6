use std::collections::BTreeSet;
use std::sync::Arc;

use culler_common::config::Config;
use culler_common::network::host::{Host, Partition};
use culler_common::policy::grouping::Grouping;
use culler_core::index::ReferenceIndex;
use culler_core::pipeline::{self, Pipeline};
use culler_core::probe::select_probe;
use culler_core::store::SnapshotStore;
use tracing::{Instrument, info};

use crate::commands::{HostArgs, StoreArgs, probe};
use crate::input;
use crate::terminal::{format, print, spinner};

pub async fn find(args: &HostArgs, store_args: &StoreArgs, cfg: &Config) -> anyhow::Result<()> {
    let hosts = input::collect_hosts(args)?;
    let store = Arc::new(SnapshotStore::load(&store_args.store)?);
    let pipeline = Pipeline::new(store.clone(), select_probe(cfg), cfg.clone());
    let groupings: Vec<Grouping> = pipeline::load_groupings(store.as_ref()).await?;

    let (_partition, index) = locate(&pipeline, &hosts, &groupings, cfg).await?;
    if index.matched.is_empty() {
        print::no_results("NO STALE OBJECTS FOUND");
    }
    print::rule();
    Ok(())
}

/// Probes `hosts` and matches the stale ones against every grouping, printing both results.
pub async fn locate(
    pipeline: &Pipeline,
    hosts: &BTreeSet<Host>,
    groupings: &[Grouping],
    cfg: &Config,
) -> anyhow::Result<(Partition, ReferenceIndex)> {
    let span = spinner::phase(&format!("Probing {} hosts...", hosts.len()));
    let partition: Partition = pipeline.partition(hosts).instrument(span).await?;
    probe::print_partition(&partition, cfg);

    if partition.stale().is_empty() {
        info!("Every host responded, nothing to look up");
        return Ok((partition, ReferenceIndex::default()));
    }

    let names: Vec<&str> = groupings.iter().map(Grouping::as_str).collect();
    info!("Groupings found: {}", names.join(", "));

    let span = spinner::phase(&format!("Searching {} groupings...", groupings.len()));
    let index: ReferenceIndex = pipeline
        .resolve_references(partition.stale(), groupings)
        .instrument(span)
        .await;

    print_matches(&index, cfg);
    Ok((partition, index))
}

fn print_matches(index: &ReferenceIndex, cfg: &Config) {
    if index.matched.is_empty() {
        return;
    }

    print::section("objects of unresponsive hosts", cfg.quiet);
    if cfg.quiet > 0 {
        return;
    }

    for (idx, matched) in index.matched.iter().enumerate() {
        print::entry(idx, matched.name(), &format::matched_to_details(matched));
    }
}
