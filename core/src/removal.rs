//! # Cascading Removal
//!
//! Strips matched objects out of the policy store in a fixed stage order:
//! address-group members, security rules, NAT rules, then the objects
//! themselves.
//!
//! Stages run one after the other. Within a stage every in-scope grouping is
//! handled by its own task, and the next stage starts only once all of them
//! have finished, so no object is deleted anywhere while a reference to it
//! may still exist in another grouping.
//!
//! Failures are recorded per (grouping, object, stage) and never stop the
//! remaining work, except when a grouping's entries cannot be enumerated: that
//! grouping is then skipped for the rest of the run.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use culler_common::error::{self, CullError};
use culler_common::policy::grouping::{Grouping, Scope};
use culler_common::policy::objects::MatchedObject;
use culler_common::policy::outcome::{RemovalOutcome, Stage, Status};
use culler_common::policy::rules::{AddressGroupEntry, NatRuleEntry, Rulebase, SecurityRuleEntry};
use culler_common::store::PolicyStore;
use tracing::{info, warn};

use crate::concurrency::FanOut;

pub struct CascadingRemover {
    store: Arc<dyn PolicyStore>,
    max_tasks: Option<usize>,
}

/// Result of running one stage against one grouping.
struct StagePass {
    grouping: Grouping,
    outcomes: Vec<RemovalOutcome>,
    /// Set when enumeration failed; the grouping is skipped from then on.
    aborted: Option<String>,
}

impl CascadingRemover {
    pub fn new(store: Arc<dyn PolicyStore>, max_tasks: Option<usize>) -> Self {
        Self { store, max_tasks }
    }

    /// Removes every matched object from the groupings selected by `scope`.
    ///
    /// Fails only when `scope` names a grouping that is not in `groupings`.
    pub async fn remove(
        &self,
        scope: &Scope,
        groupings: &[Grouping],
        matched: &[MatchedObject],
    ) -> Result<Vec<RemovalOutcome>, CullError> {
        let selected: Vec<Grouping> = scope.select(groupings);
        if let Scope::One(grouping) = scope
            && selected.is_empty()
        {
            return Err(CullError::UnknownGrouping(grouping.to_string()));
        }

        let objects: Arc<Vec<String>> = Arc::new(unique_names(matched));
        let mut outcomes: Vec<RemovalOutcome> = Vec::new();
        if objects.is_empty() {
            return Ok(outcomes);
        }

        let mut aborted: HashMap<Grouping, String> = HashMap::new();

        for stage in Stage::ORDER {
            info!("Removing {} objects: {stage} stage", objects.len());
            let targets: Vec<Grouping> = selected
                .iter()
                .filter(|g| applies_to(stage, scope, g))
                .cloned()
                .collect();

            let mut passes: HashMap<Grouping, StagePass> = HashMap::new();
            let runnable = targets.iter().filter(|g| !aborted.contains_key(*g)).cloned();
            let mut fan = FanOut::spawn(runnable, self.max_tasks, |grouping| {
                let store = self.store.clone();
                let objects = objects.clone();
                async move { Some(run_stage(store.as_ref(), stage, grouping, &objects).await) }
            });
            while let Some(pass) = fan.recv().await {
                passes.insert(pass.grouping.clone(), pass);
            }
            fan.finish().await;

            for grouping in targets {
                if let Some(reason) = aborted.get(&grouping) {
                    outcomes.extend(skipped(&grouping, stage, &objects, reason));
                    continue;
                }
                match passes.remove(&grouping) {
                    Some(pass) => {
                        if let Some(reason) = pass.aborted {
                            aborted.insert(grouping, reason);
                        }
                        outcomes.extend(pass.outcomes);
                    }
                    None => {
                        let reason = format!("{stage} task did not complete");
                        warn!("[{grouping}] {reason}");
                        outcomes.extend(failed_all(&grouping, stage, &objects, &reason));
                        aborted.insert(grouping, reason);
                    }
                }
            }
        }

        Ok(outcomes)
    }
}

/// The catch-all grouping keeps its address groups when every grouping is in scope.
fn applies_to(stage: Stage, scope: &Scope, grouping: &Grouping) -> bool {
    !(stage == Stage::AddressGroupRef && *scope == Scope::All && grouping.is_shared())
}

fn unique_names(matched: &[MatchedObject]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    matched
        .iter()
        .map(|m| m.name())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

async fn run_stage(store: &dyn PolicyStore, stage: Stage, grouping: Grouping, objects: &[String]) -> StagePass {
    let result = match stage {
        Stage::AddressGroupRef => strip_address_groups(store, &grouping, objects).await,
        Stage::SecurityRule => strip_security_rules(store, &grouping, objects).await,
        Stage::NatRule => strip_nat_rules(store, &grouping, objects).await,
        Stage::ObjectDeletion => delete_objects(store, &grouping, objects).await,
    };

    match result {
        Ok(outcomes) => StagePass {
            grouping,
            outcomes,
            aborted: None,
        },
        Err(e) => {
            warn!("{e}, skipping the remaining stages for this grouping");
            let reason = e.to_string();
            StagePass {
                outcomes: failed_all(&grouping, stage, objects, &reason),
                grouping,
                aborted: Some(reason),
            }
        }
    }
}

/// An entry that may reference address objects by name.
trait Referencing: Clone {
    fn label(&self) -> String;
    fn references(&self, name: &str) -> bool;
    /// Strips `name` and prepares the entry for submission.
    fn strip(&mut self, name: &str);
}

impl Referencing for AddressGroupEntry {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn references(&self, name: &str) -> bool {
        AddressGroupEntry::references(self, name)
    }

    fn strip(&mut self, name: &str) {
        AddressGroupEntry::strip(self, name);
    }
}

impl Referencing for (Rulebase, SecurityRuleEntry) {
    fn label(&self) -> String {
        format!("{} ({})", self.1.name, self.0)
    }

    fn references(&self, name: &str) -> bool {
        self.1.references(name)
    }

    fn strip(&mut self, name: &str) {
        self.1.strip(name);
    }
}

impl Referencing for (Rulebase, NatRuleEntry) {
    fn label(&self) -> String {
        format!("{} ({})", self.1.name, self.0)
    }

    fn references(&self, name: &str) -> bool {
        self.1.references(name)
    }

    fn strip(&mut self, name: &str) {
        self.1.strip(name);
        self.1.apply_edit_defaults();
    }
}

/// Edits every entry referencing each object, one outcome per object.
///
/// Successful edits replace the local copy so later objects build on them.
async fn sweep<E, F, Fut>(
    grouping: &Grouping,
    stage: Stage,
    objects: &[String],
    entries: &mut [E],
    edit: F,
) -> Vec<RemovalOutcome>
where
    E: Referencing,
    F: Fn(E) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let mut outcomes: Vec<RemovalOutcome> = Vec::with_capacity(objects.len());

    for object in objects {
        let mut edits: usize = 0;
        let mut failures: Vec<String> = Vec::new();

        for entry in entries.iter_mut().filter(|e| e.references(object)) {
            let mut edited: E = entry.clone();
            edited.strip(object);

            match edit(edited.clone()).await {
                Ok(()) => {
                    *entry = edited;
                    edits += 1;
                }
                Err(e) => {
                    let err = CullError::RemoteEdit {
                        grouping: grouping.clone(),
                        stage,
                        target: entry.label(),
                        reason: error::reason(&e),
                    };
                    warn!("{err} (object '{object}')");
                    failures.push(format!("{}: {}", entry.label(), error::reason(&e)));
                }
            }
        }

        outcomes.push(outcome(grouping, object, stage, edits, failures));
    }

    outcomes
}

async fn strip_address_groups(
    store: &dyn PolicyStore,
    grouping: &Grouping,
    objects: &[String],
) -> Result<Vec<RemovalOutcome>, CullError> {
    let stage = Stage::AddressGroupRef;
    let mut groups: Vec<AddressGroupEntry> = store
        .fetch_address_groups(grouping)
        .await
        .map_err(|e| fetch_error(grouping, stage, &e))?;

    Ok(sweep(grouping, stage, objects, &mut groups, |group: AddressGroupEntry| async move {
        store.edit_address_group(grouping, &group).await
    })
    .await)
}

async fn strip_security_rules(
    store: &dyn PolicyStore,
    grouping: &Grouping,
    objects: &[String],
) -> Result<Vec<RemovalOutcome>, CullError> {
    let stage = Stage::SecurityRule;
    let mut rules: Vec<(Rulebase, SecurityRuleEntry)> = Vec::new();
    for rulebase in Rulebase::ALL {
        let entries = store
            .fetch_security_rules(grouping, rulebase)
            .await
            .map_err(|e| fetch_error(grouping, stage, &e))?;
        rules.extend(entries.into_iter().map(|entry| (rulebase, entry)));
    }

    Ok(sweep(grouping, stage, objects, &mut rules, |(rulebase, rule): (Rulebase, SecurityRuleEntry)| async move {
        store.edit_security_rule(grouping, rulebase, &rule).await
    })
    .await)
}

async fn strip_nat_rules(
    store: &dyn PolicyStore,
    grouping: &Grouping,
    objects: &[String],
) -> Result<Vec<RemovalOutcome>, CullError> {
    let stage = Stage::NatRule;
    let mut rules: Vec<(Rulebase, NatRuleEntry)> = Vec::new();
    for rulebase in Rulebase::ALL {
        let entries = store
            .fetch_nat_rules(grouping, rulebase)
            .await
            .map_err(|e| fetch_error(grouping, stage, &e))?;
        rules.extend(entries.into_iter().map(|entry| (rulebase, entry)));
    }

    Ok(sweep(grouping, stage, objects, &mut rules, |(rulebase, rule): (Rulebase, NatRuleEntry)| async move {
        store.edit_nat_rule(grouping, rulebase, &rule).await
    })
    .await)
}

async fn delete_objects(
    store: &dyn PolicyStore,
    grouping: &Grouping,
    objects: &[String],
) -> Result<Vec<RemovalOutcome>, CullError> {
    let stage = Stage::ObjectDeletion;
    let mut present: HashSet<String> = store
        .list_address_object_names(grouping)
        .await
        .map_err(|e| fetch_error(grouping, stage, &e))?
        .into_iter()
        .collect();

    let mut outcomes: Vec<RemovalOutcome> = Vec::with_capacity(objects.len());
    for object in objects {
        if !present.contains(object) {
            outcomes.push(outcome(grouping, object, stage, 0, Vec::new()));
            continue;
        }

        match store.delete_address_object(grouping, object).await {
            Ok(()) => {
                present.remove(object);
                outcomes.push(outcome(grouping, object, stage, 1, Vec::new()));
            }
            Err(e) => {
                let err = CullError::RemoteEdit {
                    grouping: grouping.clone(),
                    stage,
                    target: object.clone(),
                    reason: error::reason(&e),
                };
                warn!("{err}");
                outcomes.push(outcome(grouping, object, stage, 0, vec![error::reason(&e)]));
            }
        }
    }
    Ok(outcomes)
}

fn fetch_error(grouping: &Grouping, stage: Stage, err: &anyhow::Error) -> CullError {
    CullError::Fetch {
        grouping: grouping.clone(),
        stage,
        reason: error::reason(err),
    }
}

fn outcome(grouping: &Grouping, object: &str, stage: Stage, edits: usize, failures: Vec<String>) -> RemovalOutcome {
    let status = if failures.is_empty() {
        Status::Done { edits }
    } else {
        Status::Failed {
            reason: failures.join("; "),
        }
    };
    RemovalOutcome {
        grouping: grouping.clone(),
        object: object.to_string(),
        stage,
        status,
    }
}

fn failed_all(grouping: &Grouping, stage: Stage, objects: &[String], reason: &str) -> Vec<RemovalOutcome> {
    objects
        .iter()
        .map(|object| RemovalOutcome {
            grouping: grouping.clone(),
            object: object.clone(),
            stage,
            status: Status::Failed {
                reason: reason.to_string(),
            },
        })
        .collect()
}

fn skipped(grouping: &Grouping, stage: Stage, objects: &[String], reason: &str) -> Vec<RemovalOutcome> {
    objects
        .iter()
        .map(|object| RemovalOutcome {
            grouping: grouping.clone(),
            object: object.clone(),
            stage,
            status: Status::Skipped {
                reason: format!("grouping aborted earlier: {reason}"),
            },
        })
        .collect()
}
