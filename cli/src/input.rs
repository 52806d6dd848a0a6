//! Turns command line values and host files into a validated host set.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use culler_common::error::CullError;
use culler_common::network::host::Host;
use culler_common::success;
use tracing::warn;

use crate::commands::HostArgs;

pub fn collect_hosts(args: &HostArgs) -> anyhow::Result<BTreeSet<Host>> {
    let mut hosts: BTreeSet<Host> = BTreeSet::new();

    for raw in &args.hosts {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match raw.parse::<Host>() {
            Ok(host) => {
                hosts.insert(host);
            }
            Err(_) => warn!("Skipping '{raw}': not an IP address"),
        }
    }

    if let Some(path) = &args.input {
        hosts.extend(read_hosts_file(path)?);
    }

    if hosts.is_empty() {
        return Err(CullError::NoHosts.into());
    }

    let unit: &str = if hosts.len() == 1 { "host has" } else { "hosts have" };
    success!("{} {unit} been parsed successfully", hosts.len());
    Ok(hosts)
}

pub fn read_hosts_file(path: &Path) -> anyhow::Result<BTreeSet<Host>> {
    let content: String = std::fs::read_to_string(path)
        .with_context(|| format!("opening '{}'", path.display()))?;
    Ok(parse_hosts(&content))
}

/// Reads the first column of every row. Blank rows and `#` comments are ignored,
/// anything else that is not an address is skipped with a warning.
pub fn parse_hosts(content: &str) -> BTreeSet<Host> {
    let mut hosts: BTreeSet<Host> = BTreeSet::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let first: &str = line
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches('"');

        match first.parse::<Host>() {
            Ok(host) => {
                hosts.insert(host);
            }
            Err(_) => warn!("Skipping row {}: '{first}' is not an IP address", idx + 1),
        }
    }

    hosts
}
