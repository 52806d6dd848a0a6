//! # Host Model
//!
//! A [`Host`] is a validated network address as handed over by the input
//! parser. Probing turns every host into a [`LivenessResult`], and a
//! [`Partition`] collects those verdicts into the fresh and stale sets.

use std::collections::BTreeSet;
use std::fmt;
use std::net::{AddrParseError, IpAddr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Host(IpAddr);

impl Host {
    pub fn new(ip: IpAddr) -> Self {
        Self(ip)
    }

    pub fn ip(&self) -> IpAddr {
        self.0
    }
}

impl From<IpAddr> for Host {
    fn from(ip: IpAddr) -> Self {
        Self(ip)
    }
}

impl FromStr for Host {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<IpAddr>().map(Self)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The verdict of probing one host once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessResult {
    pub host: Host,
    pub reachable: bool,
}

impl LivenessResult {
    pub fn new(host: Host, reachable: bool) -> Self {
        Self { host, reachable }
    }
}

/// Hosts split by reachability.
///
/// A host is held by exactly one of the two sets; recording a second verdict
/// for the same host moves it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    fresh: BTreeSet<Host>,
    stale: BTreeSet<Host>,
}

impl Partition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: LivenessResult) {
        if result.reachable {
            self.stale.remove(&result.host);
            self.fresh.insert(result.host);
        } else {
            self.fresh.remove(&result.host);
            self.stale.insert(result.host);
        }
    }

    pub fn fresh(&self) -> &BTreeSet<Host> {
        &self.fresh
    }

    pub fn stale(&self) -> &BTreeSet<Host> {
        &self.stale
    }

    pub fn contains(&self, host: &Host) -> bool {
        self.fresh.contains(host) || self.stale.contains(host)
    }

    pub fn len(&self) -> usize {
        self.fresh.len() + self.stale.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
