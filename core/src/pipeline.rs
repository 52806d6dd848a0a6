//! # Decommission Pipeline
//!
//! Wires the phases together: probe the candidate hosts, index and match the
//! stale ones against every grouping, then remove the matches from the chosen
//! scope. Each phase is awaited in full before the next starts, and the
//! grouping list is fixed before the run begins.

use std::collections::BTreeSet;
use std::sync::Arc;

use culler_common::config::Config;
use culler_common::error::{self, CullError};
use culler_common::network::host::{Host, Partition};
use culler_common::policy::grouping::{Grouping, Scope};
use culler_common::policy::objects::MatchedObject;
use culler_common::policy::outcome::{RemovalOutcome, Status};
use culler_common::probe::LivenessProbe;
use culler_common::store::PolicyStore;
use culler_common::success;
use tracing::info;

use crate::index::{self, ReferenceIndex};
use crate::liveness;
use crate::removal::CascadingRemover;

#[derive(Debug, Default)]
pub struct Report {
    pub partition: Partition,
    /// Groupings that contributed an empty index.
    pub index_failures: Vec<CullError>,
    pub matched: Vec<MatchedObject>,
    /// Empty on a dry run.
    pub outcomes: Vec<RemovalOutcome>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub done: usize,
    pub edits: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Report {
    pub fn summary(&self) -> Summary {
        self.outcomes.iter().fold(Summary::default(), |mut acc, outcome| {
            match &outcome.status {
                Status::Done { edits } => {
                    acc.done += 1;
                    acc.edits += edits;
                }
                Status::Failed { .. } => acc.failed += 1,
                Status::Skipped { .. } => acc.skipped += 1,
            }
            acc
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &RemovalOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Named groupings from the store followed by the shared grouping.
pub async fn load_groupings(store: &dyn PolicyStore) -> Result<Vec<Grouping>, CullError> {
    let mut groupings: Vec<Grouping> = store
        .list_groupings()
        .await
        .map_err(|e| CullError::Enumeration {
            reason: error::reason(&e),
        })?;
    groupings.retain(|g| !g.is_shared());
    groupings.push(Grouping::Shared);
    Ok(groupings)
}

pub struct Pipeline {
    store: Arc<dyn PolicyStore>,
    probe: Arc<dyn LivenessProbe>,
    cfg: Config,
}

impl Pipeline {
    pub fn new(store: Arc<dyn PolicyStore>, probe: Arc<dyn LivenessProbe>, cfg: Config) -> Self {
        Self { store, probe, cfg }
    }

    pub async fn partition(&self, hosts: &BTreeSet<Host>) -> Result<Partition, CullError> {
        if hosts.is_empty() {
            return Err(CullError::NoHosts);
        }
        info!("Probing {} hosts with {}", hosts.len(), self.probe.name());
        let partition = liveness::resolve(hosts, self.probe.clone(), self.cfg.max_tasks).await?;
        success!(
            "{} responsive, {} unresponsive",
            partition.fresh().len(),
            partition.stale().len()
        );
        Ok(partition)
    }

    pub async fn resolve_references(&self, stale: &BTreeSet<Host>, groupings: &[Grouping]) -> ReferenceIndex {
        info!(
            "Searching {} groupings for objects of {} stale hosts",
            groupings.len(),
            stale.len()
        );
        let index = index::resolve(self.store.clone(), stale, groupings, self.cfg.max_tasks).await;
        success!("{} matching objects found", index.matched.len());
        index
    }

    pub async fn remove(
        &self,
        scope: &Scope,
        groupings: &[Grouping],
        matched: &[MatchedObject],
    ) -> Result<Vec<RemovalOutcome>, CullError> {
        CascadingRemover::new(self.store.clone(), self.cfg.max_tasks)
            .remove(scope, groupings, matched)
            .await
    }

    /// Runs every phase. `groupings` must come from [`load_groupings`].
    pub async fn run(
        &self,
        hosts: &BTreeSet<Host>,
        groupings: &[Grouping],
        scope: &Scope,
    ) -> Result<Report, CullError> {
        if let Scope::One(grouping) = scope
            && !groupings.contains(grouping)
        {
            return Err(CullError::UnknownGrouping(grouping.to_string()));
        }

        let partition = self.partition(hosts).await?;
        if partition.stale().is_empty() {
            info!("Every host responded, nothing to remove");
            return Ok(Report {
                partition,
                ..Default::default()
            });
        }

        let index = self.resolve_references(partition.stale(), groupings).await;
        let outcomes = if self.cfg.dry_run || index.matched.is_empty() {
            Vec::new()
        } else {
            self.remove(scope, groupings, &index.matched).await?
        };

        Ok(Report {
            partition,
            index_failures: index.failures,
            matched: index.matched,
            outcomes,
        })
    }
}
