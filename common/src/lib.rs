//! Shared vocabulary for `culler`.
//!
//! Everything the pipeline passes between stages lives here: hosts and their
//! liveness verdicts, policy groupings and the entries stored in them, the
//! removal outcome records, the error taxonomy and the two ports
//! ([`store::PolicyStore`], [`probe::LivenessProbe`]) that concrete adapters implement.

pub mod config;
pub mod error;
pub mod log;
pub mod network;
pub mod policy;
pub mod probe;
pub mod store;
pub mod utils;

#[doc(hidden)]
pub use tracing as __tracing;
