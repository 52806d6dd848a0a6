use serde::{Deserialize, Serialize};

use crate::network::host::Host;
use crate::policy::grouping::Grouping;

/// Separator between an address and its prefix length.
pub const PREFIX_SEPARATOR: char = '/';

/// A named address entry. `value` is a bare address or `address/prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressObject {
    pub name: String,
    pub value: String,
}

impl AddressObject {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Whether this object stands for `host`: the value equals the address, or
    /// the part before the prefix separator does.
    pub fn refers_to(&self, host: &Host) -> bool {
        let host = host.to_string();
        if self.value == host {
            return true;
        }
        match self.value.split_once(PREFIX_SEPARATOR) {
            Some((address, _prefix)) => address == host,
            None => false,
        }
    }
}

/// An address object that stands for a stale host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchedObject {
    pub object: AddressObject,
    pub host: Host,
    pub grouping: Grouping,
}

impl MatchedObject {
    pub fn name(&self) -> &str {
        &self.object.name
    }
}
