//! The policy store port.
//!
//! Everything the pipeline reads from or writes to the remote store goes
//! through [`PolicyStore`]. Implementations own transport, authentication and
//! retries; the pipeline only adds context to the errors they return.

use async_trait::async_trait;

use crate::policy::grouping::Grouping;
use crate::policy::objects::AddressObject;
use crate::policy::rules::{AddressGroupEntry, NatRuleEntry, Rulebase, SecurityRuleEntry};

#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Named groupings. The synthetic shared grouping is not included.
    async fn list_groupings(&self) -> anyhow::Result<Vec<Grouping>>;

    async fn fetch_address_objects(&self, grouping: &Grouping) -> anyhow::Result<Vec<AddressObject>>;

    async fn fetch_address_groups(&self, grouping: &Grouping) -> anyhow::Result<Vec<AddressGroupEntry>>;

    async fn edit_address_group(&self, grouping: &Grouping, entry: &AddressGroupEntry) -> anyhow::Result<()>;

    async fn fetch_security_rules(
        &self,
        grouping: &Grouping,
        rulebase: Rulebase,
    ) -> anyhow::Result<Vec<SecurityRuleEntry>>;

    async fn edit_security_rule(
        &self,
        grouping: &Grouping,
        rulebase: Rulebase,
        entry: &SecurityRuleEntry,
    ) -> anyhow::Result<()>;

    async fn fetch_nat_rules(&self, grouping: &Grouping, rulebase: Rulebase) -> anyhow::Result<Vec<NatRuleEntry>>;

    async fn edit_nat_rule(&self, grouping: &Grouping, rulebase: Rulebase, entry: &NatRuleEntry) -> anyhow::Result<()>;

    async fn list_address_object_names(&self, grouping: &Grouping) -> anyhow::Result<Vec<String>>;

    async fn delete_address_object(&self, grouping: &Grouping, name: &str) -> anyhow::Result<()>;
}
