//! Test doubles shared by the integration tests.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::bail;
use async_trait::async_trait;
use culler_common::error::CullError;
use culler_common::network::host::Host;
use culler_common::policy::grouping::Grouping;
use culler_common::policy::objects::AddressObject;
use culler_common::policy::rules::{AddressGroupEntry, NatRuleEntry, Rulebase, SecurityRuleEntry};
use culler_common::probe::LivenessProbe;
use culler_common::store::PolicyStore;
use culler_core::store::SnapshotStore;

/// Two device groups plus shared, with 10.10.10.10 referenced everywhere.
pub const SNAPSHOT: &str = r#"{
    "shared": {
        "addresses": [
            { "name": "dns", "value": "8.8.8.8" },
            { "name": "old-shared", "value": "10.10.10.10" }
        ],
        "address_groups": [{ "name": "infra", "static_members": ["old-shared", "dns"] }],
        "security": { "post": [{ "name": "deny-old", "source_addresses": ["old-shared"], "destination_addresses": ["any"] }] }
    },
    "device_groups": {
        "branch-1": {
            "addresses": [
                { "name": "old-branch-gw", "value": "10.10.10.10/32" },
                { "name": "printer", "value": "10.10.10.100" }
            ],
            "address_groups": [{ "name": "gateways", "static_members": ["old-branch-gw", "printer"] }],
            "security": {
                "pre": [{ "name": "allow-gw", "source_addresses": ["old-branch-gw", "printer"], "destination_addresses": ["any"] }],
                "post": [{ "name": "log-gw", "source_addresses": ["any"], "destination_addresses": ["old-branch-gw"] }]
            },
            "nat": { "pre": [{ "name": "snat-gw", "source_addresses": ["old-branch-gw"], "destination_addresses": ["any"] }] }
        },
        "branch-2": {
            "addresses": [{ "name": "old-branch-gw", "value": "10.10.10.10" }],
            "security": { "pre": [{ "name": "allow-2", "source_addresses": ["old-branch-gw"], "destination_addresses": ["any"] }] }
        }
    }
}"#;

pub fn snapshot_store() -> SnapshotStore {
    SnapshotStore::new(serde_json::from_str(SNAPSHOT).expect("fixture parses"))
}

pub fn host(s: &str) -> Host {
    s.parse().expect("valid host")
}

pub fn hosts(list: &[&str]) -> BTreeSet<Host> {
    list.iter().map(|s| host(s)).collect()
}

/// One call made against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: &'static str,
    pub grouping: Option<Grouping>,
}

/// Wraps a [`SnapshotStore`], records every call and fails the ones it was told to.
pub struct RecordingStore {
    inner: SnapshotStore,
    calls: Mutex<Vec<Call>>,
    failing_ops: HashSet<(&'static str, Grouping)>,
    failing_entries: HashSet<String>,
}

impl RecordingStore {
    pub fn new(inner: SnapshotStore) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            failing_ops: HashSet::new(),
            failing_entries: HashSet::new(),
        }
    }

    /// Makes `op` fail for `grouping`.
    pub fn failing(mut self, op: &'static str, grouping: Grouping) -> Self {
        self.failing_ops.insert((op, grouping));
        self
    }

    /// Makes every edit or delete of the entry called `name` fail.
    pub fn rejecting(mut self, name: &str) -> Self {
        self.failing_entries.insert(name.to_string());
        self
    }

    pub fn inner(&self) -> &SnapshotStore {
        &self.inner
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    /// Position of the first and last call of `op`.
    pub fn span_of(&self, op: &str) -> Option<(usize, usize)> {
        let calls = self.lock();
        let first = calls.iter().position(|c| c.op == op)?;
        let last = calls.iter().rposition(|c| c.op == op)?;
        Some((first, last))
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, op: &'static str, grouping: Option<&Grouping>, entry: Option<&str>) -> anyhow::Result<()> {
        self.lock().push(Call {
            op,
            grouping: grouping.cloned(),
        });
        if let Some(grouping) = grouping
            && self.failing_ops.contains(&(op, grouping.clone()))
        {
            bail!("injected {op} failure in {grouping}");
        }
        if let Some(name) = entry
            && self.failing_entries.contains(name)
        {
            bail!("injected rejection of '{name}'");
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyStore for RecordingStore {
    async fn list_groupings(&self) -> anyhow::Result<Vec<Grouping>> {
        self.record("list_groupings", None, None)?;
        self.inner.list_groupings().await
    }

    async fn fetch_address_objects(&self, grouping: &Grouping) -> anyhow::Result<Vec<AddressObject>> {
        self.record("fetch_address_objects", Some(grouping), None)?;
        self.inner.fetch_address_objects(grouping).await
    }

    async fn fetch_address_groups(&self, grouping: &Grouping) -> anyhow::Result<Vec<AddressGroupEntry>> {
        self.record("fetch_address_groups", Some(grouping), None)?;
        self.inner.fetch_address_groups(grouping).await
    }

    async fn edit_address_group(&self, grouping: &Grouping, entry: &AddressGroupEntry) -> anyhow::Result<()> {
        self.record("edit_address_group", Some(grouping), Some(&entry.name))?;
        self.inner.edit_address_group(grouping, entry).await
    }

    async fn fetch_security_rules(
        &self,
        grouping: &Grouping,
        rulebase: Rulebase,
    ) -> anyhow::Result<Vec<SecurityRuleEntry>> {
        self.record("fetch_security_rules", Some(grouping), None)?;
        self.inner.fetch_security_rules(grouping, rulebase).await
    }

    async fn edit_security_rule(
        &self,
        grouping: &Grouping,
        rulebase: Rulebase,
        entry: &SecurityRuleEntry,
    ) -> anyhow::Result<()> {
        self.record("edit_security_rule", Some(grouping), Some(&entry.name))?;
        self.inner.edit_security_rule(grouping, rulebase, entry).await
    }

    async fn fetch_nat_rules(&self, grouping: &Grouping, rulebase: Rulebase) -> anyhow::Result<Vec<NatRuleEntry>> {
        self.record("fetch_nat_rules", Some(grouping), None)?;
        self.inner.fetch_nat_rules(grouping, rulebase).await
    }

    async fn edit_nat_rule(&self, grouping: &Grouping, rulebase: Rulebase, entry: &NatRuleEntry) -> anyhow::Result<()> {
        self.record("edit_nat_rule", Some(grouping), Some(&entry.name))?;
        self.inner.edit_nat_rule(grouping, rulebase, entry).await
    }

    async fn list_address_object_names(&self, grouping: &Grouping) -> anyhow::Result<Vec<String>> {
        self.record("list_address_object_names", Some(grouping), None)?;
        self.inner.list_address_object_names(grouping).await
    }

    async fn delete_address_object(&self, grouping: &Grouping, name: &str) -> anyhow::Result<()> {
        self.record("delete_address_object", Some(grouping), Some(name))?;
        self.inner.delete_address_object(grouping, name).await
    }
}

/// Answers from a fixed set of reachable hosts.
pub struct FixedProbe {
    reachable: BTreeSet<Host>,
}

impl FixedProbe {
    pub fn new(reachable: &[&str]) -> Self {
        Self {
            reachable: hosts(reachable),
        }
    }
}

#[async_trait]
impl LivenessProbe for FixedProbe {
    async fn probe(&self, host: &Host) -> Result<bool, CullError> {
        Ok(self.reachable.contains(host))
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Fails with a transient error for every host.
pub struct FlakyProbe;

#[async_trait]
impl LivenessProbe for FlakyProbe {
    async fn probe(&self, host: &Host) -> Result<bool, CullError> {
        Err(CullError::Probe {
            host: host.to_string(),
            reason: "network unreachable".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}
