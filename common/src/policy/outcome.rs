use std::fmt;

use crate::policy::grouping::Grouping;

/// Removal stages, in the order they must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    AddressGroupRef,
    SecurityRule,
    NatRule,
    ObjectDeletion,
}

impl Stage {
    pub const ORDER: [Stage; 4] = [
        Stage::AddressGroupRef,
        Stage::SecurityRule,
        Stage::NatRule,
        Stage::ObjectDeletion,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::AddressGroupRef => "address group",
            Stage::SecurityRule => "security rule",
            Stage::NatRule => "nat rule",
            Stage::ObjectDeletion => "object deletion",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The stage finished; `edits` counts the entries that were changed.
    Done { edits: usize },
    Failed { reason: String },
    /// Not attempted because an earlier enumeration failure aborted the grouping.
    Skipped { reason: String },
}

/// What happened to one object, in one grouping, at one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub grouping: Grouping,
    pub object: String,
    pub stage: Stage,
    pub status: Status,
}

impl RemovalOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, Status::Done { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, Status::Failed { .. })
    }
}
