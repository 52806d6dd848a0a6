//! Address groups and rulebase entries, and how a name is stripped from them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::dedup;

pub const DEFAULT_NAT_TYPE: &str = "ipv4";
pub const DEFAULT_TO_INTERFACE: &str = "any";
pub const DEFAULT_SERVICE: &str = "any";
pub const DEFAULT_TRANSLATION_TYPE: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rulebase {
    Pre,
    Post,
}

impl Rulebase {
    pub const ALL: [Rulebase; 2] = [Rulebase::Pre, Rulebase::Post];
}

impl fmt::Display for Rulebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rulebase::Pre => f.write_str("pre-rulebase"),
            Rulebase::Post => f.write_str("post-rulebase"),
        }
    }
}

/// Replaces `list` with its filtered form. Returns whether `name` was present.
fn strip_from(list: &mut Vec<String>, name: &str) -> bool {
    if !list.iter().any(|item| item == name) {
        return false;
    }
    *list = dedup::filter(list, name);
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressGroupEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub static_members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_match: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl AddressGroupEntry {
    pub fn references(&self, name: &str) -> bool {
        self.static_members.iter().any(|m| m == name)
    }

    pub fn strip(&mut self, name: &str) -> bool {
        strip_from(&mut self.static_members, name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRuleEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub source_addresses: Vec<String>,
    #[serde(default)]
    pub destination_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SecurityRuleEntry {
    pub fn references(&self, name: &str) -> bool {
        self.source_addresses.iter().any(|a| a == name)
            || self.destination_addresses.iter().any(|a| a == name)
    }

    pub fn strip(&mut self, name: &str) -> bool {
        let source = strip_from(&mut self.source_addresses, name);
        let destination = strip_from(&mut self.destination_addresses, name);
        source || destination
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatRuleEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub nat_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_interface: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default)]
    pub source_addresses: Vec<String>,
    #[serde(default)]
    pub destination_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sat_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sat_translated_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sat_fallback_translated_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dat_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dat_address: Option<String>,
}

impl NatRuleEntry {
    pub fn references(&self, name: &str) -> bool {
        [
            &self.source_addresses,
            &self.destination_addresses,
            &self.sat_translated_addresses,
            &self.sat_fallback_translated_addresses,
        ]
        .iter()
        .any(|list| list.iter().any(|a| a == name))
    }

    pub fn strip(&mut self, name: &str) -> bool {
        let mut changed = strip_from(&mut self.source_addresses, name);
        changed |= strip_from(&mut self.destination_addresses, name);
        changed |= strip_from(&mut self.sat_translated_addresses, name);
        changed |= strip_from(&mut self.sat_fallback_translated_addresses, name);
        changed
    }

    /// Fills the fields the store requires on every edit. Explicit values are kept.
    pub fn apply_edit_defaults(&mut self) {
        fill_if_unset(&mut self.nat_type, DEFAULT_NAT_TYPE);
        fill_if_unset(&mut self.to_interface, DEFAULT_TO_INTERFACE);
        fill_if_unset(&mut self.service, DEFAULT_SERVICE);
        fill_if_unset(&mut self.sat_type, DEFAULT_TRANSLATION_TYPE);
        fill_if_unset(&mut self.dat_type, DEFAULT_TRANSLATION_TYPE);
    }
}

fn fill_if_unset(field: &mut Option<String>, default: &str) {
    let unset = field.as_deref().is_none_or(|value| value.trim().is_empty());
    if unset {
        *field = Some(default.to_string());
    }
}
