//! Liveness probe adapters.
//!
//! [`IcmpProbe`] sends raw echo requests and needs root. [`TcpHandshakeProbe`]
//! works unprivileged by attempting TCP connections. [`select_probe`] picks one.

use std::sync::Arc;

use culler_common::config::Config;
use culler_common::probe::LivenessProbe;
use tracing::{info, warn};

mod icmp;
mod tcp;

pub use icmp::IcmpProbe;
pub use tcp::TcpHandshakeProbe;

/// ICMP when running as root, otherwise the handshake probe.
pub fn select_probe(cfg: &Config) -> Arc<dyn LivenessProbe> {
    let tcp = TcpHandshakeProbe::new(cfg.probe.tcp_ports.clone(), cfg.probe.timeout);

    if cfg.force_tcp {
        info!("Using TCP handshake probes on ports {:?}", cfg.probe.tcp_ports);
        return Arc::new(tcp);
    }

    if is_root::is_root() {
        info!(
            "Using ICMP echo probes ({} per host, {}s timeout)",
            cfg.probe.count,
            cfg.probe.timeout.as_secs_f64()
        );
        Arc::new(IcmpProbe::new(cfg.probe.count, cfg.probe.timeout, tcp))
    } else {
        warn!("Not running as root, falling back to TCP handshake probes");
        Arc::new(tcp)
    }
}
