use thiserror::Error;

use crate::policy::{grouping::Grouping, outcome::Stage};

#[derive(Debug, Error)]
pub enum CullError {
    /// The probe itself could not be built. Aborts the run.
    #[error("cannot probe {host}: {reason}")]
    ProbeConfig { host: String, reason: String },

    /// A probe ran but did not complete cleanly. The host is classified stale.
    #[error("probe of {host} failed: {reason}")]
    Probe { host: String, reason: String },

    #[error("cannot enumerate groupings: {reason}")]
    Enumeration { reason: String },

    #[error("[{grouping}] failed to fetch address objects: {reason}")]
    GroupingFetch { grouping: Grouping, reason: String },

    #[error("[{grouping}] {stage}: failed to enumerate entries: {reason}")]
    Fetch {
        grouping: Grouping,
        stage: Stage,
        reason: String,
    },

    #[error("[{grouping}] {stage}: failed to edit '{target}': {reason}")]
    RemoteEdit {
        grouping: Grouping,
        stage: Stage,
        target: String,
        reason: String,
    },

    #[error("unknown grouping '{0}'")]
    UnknownGrouping(String),

    #[error("no hosts found in input")]
    NoHosts,
}

impl CullError {
    /// Fatal errors end the run; everything else is logged and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CullError::ProbeConfig { .. }
                | CullError::Enumeration { .. }
                | CullError::UnknownGrouping(_)
                | CullError::NoHosts
        )
    }
}

/// Renders an error chain on one line.
pub fn reason(err: &anyhow::Error) -> String {
    format!("{err:#}")
}
