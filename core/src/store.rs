//! A [`PolicyStore`] backed by a JSON snapshot of the policy configuration.
//!
//! The whole snapshot is held in memory. Edits are applied in place and
//! journaled, and [`SnapshotStore::save`] writes the result back out, so an
//! exported configuration can be cleaned offline and reviewed before import.
//!
//! Like the live store, it refuses to delete an address object while an
//! address group or rule still lists it.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use culler_common::policy::grouping::Grouping;
use culler_common::policy::objects::AddressObject;
use culler_common::policy::rules::{AddressGroupEntry, NatRuleEntry, Rulebase, SecurityRuleEntry};
use culler_common::store::PolicyStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rulebases<E> {
    #[serde(default)]
    pub pre: Vec<E>,
    #[serde(default)]
    pub post: Vec<E>,
}

impl<E> Rulebases<E> {
    pub fn get(&self, rulebase: Rulebase) -> &Vec<E> {
        match rulebase {
            Rulebase::Pre => &self.pre,
            Rulebase::Post => &self.post,
        }
    }

    pub fn get_mut(&mut self, rulebase: Rulebase) -> &mut Vec<E> {
        match rulebase {
            Rulebase::Pre => &mut self.pre,
            Rulebase::Post => &mut self.post,
        }
    }
}

/// Everything one grouping holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySet {
    #[serde(default)]
    pub addresses: Vec<AddressObject>,
    #[serde(default)]
    pub address_groups: Vec<AddressGroupEntry>,
    #[serde(default)]
    pub security: Rulebases<SecurityRuleEntry>,
    #[serde(default)]
    pub nat: Rulebases<NatRuleEntry>,
}

impl PolicySet {
    pub fn defines(&self, name: &str) -> bool {
        self.addresses.iter().any(|a| a.name == name)
    }

    /// The first entry that still lists `name`, described for an error message.
    pub fn referrer(&self, name: &str) -> Option<String> {
        if let Some(group) = self.address_groups.iter().find(|g| g.references(name)) {
            return Some(format!("address group '{}'", group.name));
        }
        for rulebase in Rulebase::ALL {
            if let Some(rule) = self.security.get(rulebase).iter().find(|r| r.references(name)) {
                return Some(format!("security rule '{}' ({rulebase})", rule.name));
            }
            if let Some(rule) = self.nat.get(rulebase).iter().find(|r| r.references(name)) {
                return Some(format!("nat rule '{}' ({rulebase})", rule.name));
            }
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub shared: PolicySet,
    #[serde(default)]
    pub device_groups: BTreeMap<String, PolicySet>,
}

impl Snapshot {
    pub fn policy_set(&self, grouping: &Grouping) -> anyhow::Result<&PolicySet> {
        match grouping {
            Grouping::Shared => Ok(&self.shared),
            Grouping::Named(name) => self
                .device_groups
                .get(name)
                .ok_or_else(|| anyhow!("grouping '{name}' does not exist")),
        }
    }

    pub fn policy_set_mut(&mut self, grouping: &Grouping) -> anyhow::Result<&mut PolicySet> {
        match grouping {
            Grouping::Shared => Ok(&mut self.shared),
            Grouping::Named(name) => self
                .device_groups
                .get_mut(name)
                .ok_or_else(|| anyhow!("grouping '{name}' does not exist")),
        }
    }

    /// Where the object `name` of `grouping` is still in use.
    ///
    /// Shared objects are visible to every device group, so those are searched
    /// too, except the ones that define an object of the same name themselves.
    pub fn referrer(&self, grouping: &Grouping, name: &str) -> anyhow::Result<Option<String>> {
        if let Some(found) = self.policy_set(grouping)?.referrer(name) {
            return Ok(Some(found));
        }
        if !grouping.is_shared() {
            return Ok(None);
        }
        Ok(self
            .device_groups
            .iter()
            .filter(|(_, set)| !set.defines(name))
            .find_map(|(group, set)| set.referrer(name).map(|found| format!("{found} in {group}"))))
    }
}

/// One mutation applied to the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    AddressGroupEdited { grouping: Grouping, name: String },
    SecurityRuleEdited { grouping: Grouping, rulebase: Rulebase, name: String },
    NatRuleEdited { grouping: Grouping, rulebase: Rulebase, name: String },
    AddressObjectDeleted { grouping: Grouping, name: String },
}

pub struct SnapshotStore {
    state: RwLock<Snapshot>,
    journal: Mutex<Vec<Change>>,
}

impl SnapshotStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
            journal: Mutex::new(Vec::new()),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw: String = std::fs::read_to_string(path)
            .with_context(|| format!("reading snapshot '{}'", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("parsing snapshot '{}'", path.display()))?;
        Ok(Self::new(snapshot))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json: String = serde_json::to_string_pretty(&self.snapshot()?)?;
        std::fs::write(path, json).with_context(|| format!("writing snapshot '{}'", path.display()))?;
        Ok(())
    }

    pub fn snapshot(&self) -> anyhow::Result<Snapshot> {
        self.read(|snapshot| Ok(snapshot.clone()))
    }

    /// Mutations applied so far, oldest first.
    pub fn journal(&self) -> Vec<Change> {
        self.journal.lock().map(|j| j.clone()).unwrap_or_default()
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> anyhow::Result<T>) -> anyhow::Result<T> {
        let state = self.state.read().map_err(|_| anyhow!("snapshot lock poisoned"))?;
        f(&state)
    }

    fn write(&self, change: Change, f: impl FnOnce(&mut Snapshot) -> anyhow::Result<()>) -> anyhow::Result<()> {
        let mut state = self.state.write().map_err(|_| anyhow!("snapshot lock poisoned"))?;
        f(&mut state)?;
        self.journal
            .lock()
            .map_err(|_| anyhow!("journal lock poisoned"))?
            .push(change);
        Ok(())
    }
}

fn replace_by_name<E>(entries: &mut [E], entry: &E, name_of: impl Fn(&E) -> &str, kind: &str) -> anyhow::Result<()>
where
    E: Clone,
{
    let name = name_of(entry);
    match entries.iter_mut().find(|e| name_of(e) == name) {
        Some(slot) => {
            *slot = entry.clone();
            Ok(())
        }
        None => bail!("{kind} '{name}' does not exist"),
    }
}

#[async_trait]
impl PolicyStore for SnapshotStore {
    async fn list_groupings(&self) -> anyhow::Result<Vec<Grouping>> {
        self.read(|s| Ok(s.device_groups.keys().map(|name| Grouping::named(name.as_str())).collect()))
    }

    async fn fetch_address_objects(&self, grouping: &Grouping) -> anyhow::Result<Vec<AddressObject>> {
        self.read(|s| Ok(s.policy_set(grouping)?.addresses.clone()))
    }

    async fn fetch_address_groups(&self, grouping: &Grouping) -> anyhow::Result<Vec<AddressGroupEntry>> {
        self.read(|s| Ok(s.policy_set(grouping)?.address_groups.clone()))
    }

    async fn edit_address_group(&self, grouping: &Grouping, entry: &AddressGroupEntry) -> anyhow::Result<()> {
        let change = Change::AddressGroupEdited {
            grouping: grouping.clone(),
            name: entry.name.clone(),
        };
        self.write(change, |s| {
            let set = s.policy_set_mut(grouping)?;
            replace_by_name(&mut set.address_groups, entry, |e| &e.name, "address group")
        })
    }

    async fn fetch_security_rules(&self, grouping: &Grouping, rulebase: Rulebase) -> anyhow::Result<Vec<SecurityRuleEntry>> {
        self.read(|s| Ok(s.policy_set(grouping)?.security.get(rulebase).clone()))
    }

    async fn edit_security_rule(
        &self,
        grouping: &Grouping,
        rulebase: Rulebase,
        entry: &SecurityRuleEntry,
    ) -> anyhow::Result<()> {
        let change = Change::SecurityRuleEdited {
            grouping: grouping.clone(),
            rulebase,
            name: entry.name.clone(),
        };
        self.write(change, |s| {
            let rules = s.policy_set_mut(grouping)?.security.get_mut(rulebase);
            replace_by_name(rules, entry, |e| &e.name, "security rule")
        })
    }

    async fn fetch_nat_rules(&self, grouping: &Grouping, rulebase: Rulebase) -> anyhow::Result<Vec<NatRuleEntry>> {
        self.read(|s| Ok(s.policy_set(grouping)?.nat.get(rulebase).clone()))
    }

    async fn edit_nat_rule(&self, grouping: &Grouping, rulebase: Rulebase, entry: &NatRuleEntry) -> anyhow::Result<()> {
        let change = Change::NatRuleEdited {
            grouping: grouping.clone(),
            rulebase,
            name: entry.name.clone(),
        };
        self.write(change, |s| {
            let rules = s.policy_set_mut(grouping)?.nat.get_mut(rulebase);
            replace_by_name(rules, entry, |e| &e.name, "nat rule")
        })
    }

    async fn list_address_object_names(&self, grouping: &Grouping) -> anyhow::Result<Vec<String>> {
        self.read(|s| {
            Ok(s.policy_set(grouping)?
                .addresses
                .iter()
                .map(|a| a.name.clone())
                .collect())
        })
    }

    async fn delete_address_object(&self, grouping: &Grouping, name: &str) -> anyhow::Result<()> {
        let change = Change::AddressObjectDeleted {
            grouping: grouping.clone(),
            name: name.to_string(),
        };
        self.write(change, |s| {
            if !s.policy_set(grouping)?.defines(name) {
                bail!("address object '{name}' does not exist");
            }
            if let Some(referrer) = s.referrer(grouping, name)? {
                bail!("address object '{name}' is still referenced by {referrer}");
            }
            s.policy_set_mut(grouping)?.addresses.retain(|a| a.name != name);
            Ok(())
        })
    }
}
