use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::bail;
use colored::*;
use console::Term;
use culler_common::config::Config;
use culler_common::error::CullError;
use culler_common::policy::grouping::{Grouping, Scope};
use culler_common::policy::outcome::RemovalOutcome;
use culler_common::success;
use culler_core::pipeline::{self, Pipeline, Report};
use culler_core::probe::select_probe;
use culler_core::store::SnapshotStore;
use tracing::{Instrument, info, warn};

use crate::commands::{HostArgs, StoreArgs, find};
use crate::input;
use crate::terminal::format::Detail;
use crate::terminal::{colors, format, print, spinner};

pub async fn purge(
    args: &HostArgs,
    store_args: &StoreArgs,
    scope: &Scope,
    output: Option<&Path>,
    cfg: &Config,
) -> anyhow::Result<()> {
    let hosts = input::collect_hosts(args)?;
    let store = Arc::new(SnapshotStore::load(&store_args.store)?);
    let pipeline = Pipeline::new(store.clone(), select_probe(cfg), cfg.clone());

    let groupings: Vec<Grouping> = pipeline::load_groupings(store.as_ref()).await?;
    if let Scope::One(grouping) = scope
        && !groupings.contains(grouping)
    {
        return Err(CullError::UnknownGrouping(grouping.to_string()).into());
    }

    let start_time: Instant = Instant::now();
    let (partition, index) = find::locate(&pipeline, &hosts, &groupings, cfg).await?;
    if index.matched.is_empty() {
        print::no_results("NOTHING TO REMOVE");
        print::rule();
        return Ok(());
    }

    if cfg.dry_run {
        info!("Dry run: {} objects would be removed from scope '{scope}'", index.matched.len());
        print::rule();
        return Ok(());
    }

    if !cfg.assume_yes && !confirm(index.matched.len(), scope)? {
        warn!("Aborted, nothing was removed");
        return Ok(());
    }

    let span = spinner::phase(&format!("Removing {} objects...", index.matched.len()));
    let outcomes: Vec<RemovalOutcome> = pipeline
        .remove(scope, &groupings, &index.matched)
        .instrument(span)
        .await?;

    let report = Report {
        partition,
        index_failures: index.failures,
        matched: index.matched,
        outcomes,
    };

    let target: &Path = output.unwrap_or(&store_args.store);
    store.save(target)?;
    success!(
        "{} changes written to '{}'",
        store.journal().len(),
        target.display()
    );

    print_outcomes(&report, &groupings, cfg);
    print_summary(&report, start_time.elapsed(), cfg);
    Ok(())
}

fn confirm(count: usize, scope: &Scope) -> anyhow::Result<bool> {
    let term = Term::stdout();
    if !term.is_term() {
        bail!("refusing to remove objects without confirmation on a non-interactive terminal, pass --yes");
    }

    term.write_str(&format!(
        "Remove {} objects and their references from '{}'? [y/N] ",
        count.to_string().bold(),
        scope.to_string().color(colors::ACCENT)
    ))?;
    let answer: String = term.read_line()?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn print_outcomes(report: &Report, groupings: &[Grouping], cfg: &Config) {
    print::section("removal", cfg.quiet);
    if cfg.quiet > 0 {
        return;
    }

    let mut by_grouping: BTreeMap<usize, Vec<&RemovalOutcome>> = BTreeMap::new();
    for outcome in &report.outcomes {
        let position = groupings
            .iter()
            .position(|g| *g == outcome.grouping)
            .unwrap_or(groupings.len());
        by_grouping.entry(position).or_default().push(outcome);
    }

    for (idx, outcomes) in by_grouping.values().enumerate() {
        let Some(first) = outcomes.first() else {
            continue;
        };
        let details: Vec<Detail> = outcomes.iter().map(|o| format::outcome_to_detail(o)).collect();
        print::entry(idx, first.grouping.as_str(), &details);
        if idx + 1 != by_grouping.len() {
            crate::cprint!();
        }
    }
}

fn print_summary(report: &Report, total_time: Duration, cfg: &Config) {
    let summary = report.summary();

    let objects: ColoredString = format!("{} objects", report.matched.len()).bold().green();
    let edits: ColoredString = format!("{} edits", summary.edits).bold().green();
    let failed: ColoredString = if summary.failed == 0 {
        "0 failures".normal()
    } else {
        format!("{} failures", summary.failed).bold().red()
    };
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: String = format!("Cleanup Complete: {objects}, {edits}, {failed} in {total_time}");

    match cfg.quiet {
        0 => {
            print::rule();
            print::centered(&output);
        }
        _ => print::print(&output),
    }

    let mut failures = report.failures().peekable();
    if failures.peek().is_some() {
        print::print(&format!("{}", "Needs manual follow-up:".yellow().bold()));
        for outcome in failures {
            print::bullet(format!(
                "[{}] {} / {}: {}",
                outcome.grouping,
                outcome.object,
                outcome.stage,
                format::status_to_value(&outcome.status)
            ));
        }
    }
    for failure in &report.index_failures {
        print::bullet(format!("{}", failure.to_string().yellow()));
    }

    print::print(&format!(
        "{}",
        "Review the changes before committing them to the store.".color(colors::SECONDARY)
    ));
    print::rule();
}
