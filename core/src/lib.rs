//! Resolution and removal engine for `culler`.
//!
//! * [`liveness`] splits candidate hosts into fresh and stale.
//! * [`index`] finds the address objects that stand for stale hosts.
//! * [`removal`] strips and deletes those objects in dependency order.
//! * [`pipeline`] runs the phases in sequence and builds the report.
//!
//! [`probe`] and [`store`] hold the concrete adapters for the
//! `culler-common` ports.

mod concurrency;
mod network;

pub mod index;
pub mod liveness;
pub mod pipeline;
pub mod probe;
pub mod removal;
pub mod store;
