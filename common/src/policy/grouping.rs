use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name of the synthetic catch-all grouping.
pub const SHARED: &str = "shared";
/// Scope keyword selecting every grouping.
pub const ALL: &str = "all";

/// One partition of the policy store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Grouping {
    /// Configuration visible to every other grouping.
    Shared,
    Named(String),
}

impl Grouping {
    pub fn named(name: impl Into<String>) -> Self {
        let name: String = name.into();
        if name == SHARED {
            Grouping::Shared
        } else {
            Grouping::Named(name)
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Grouping::Shared)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Grouping::Shared => SHARED,
            Grouping::Named(name) => name,
        }
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Grouping {
    fn from(name: String) -> Self {
        Grouping::named(name)
    }
}

impl From<Grouping> for String {
    fn from(grouping: Grouping) -> Self {
        grouping.as_str().to_string()
    }
}

/// Which groupings removal touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    One(Grouping),
}

impl Scope {
    /// Groupings covered by this scope, in the order of `known`.
    pub fn select(&self, known: &[Grouping]) -> Vec<Grouping> {
        match self {
            Scope::All => known.to_vec(),
            Scope::One(grouping) => known.iter().filter(|g| *g == grouping).cloned().collect(),
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("scope cannot be empty".into());
        }
        if s.eq_ignore_ascii_case(ALL) {
            return Ok(Scope::All);
        }
        Ok(Scope::One(Grouping::named(s)))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str(ALL),
            Scope::One(grouping) => grouping.fmt(f),
        }
    }
}
