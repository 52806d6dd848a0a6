//! Policy store data model.
//!
//! These types mirror what the remote store holds for one grouping: address
//! objects, address groups, and the security and NAT rulebases.

pub mod grouping;
pub mod objects;
pub mod outcome;
pub mod rules;
