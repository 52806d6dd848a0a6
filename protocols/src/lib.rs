//! Packet codecs used by the liveness probes.

pub mod icmp;
