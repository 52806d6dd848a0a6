//! # Stale Host Resolution
//!
//! Probes every candidate host concurrently and splits them into fresh and
//! stale sets. Verdicts flow through a single consumer, which is the only
//! writer of the [`Partition`].
//!
//! A probe that errors, panics or never reports marks its host **stale**: a
//! host is only kept when it positively answered. Configuration errors from
//! the probe are fatal and cancel the remaining probes.

use std::collections::BTreeSet;
use std::sync::Arc;

use culler_common::error::CullError;
use culler_common::network::host::{Host, LivenessResult, Partition};
use culler_common::probe::LivenessProbe;
use tracing::{debug, warn};

use crate::concurrency::FanOut;

type Verdict = (Host, Result<bool, CullError>);

pub async fn resolve(
    hosts: &BTreeSet<Host>,
    probe: Arc<dyn LivenessProbe>,
    max_tasks: Option<usize>,
) -> Result<Partition, CullError> {
    let mut fan: FanOut<Verdict> = FanOut::spawn(hosts.iter().copied(), max_tasks, |host| {
        let probe = probe.clone();
        async move { Some((host, probe.probe(&host).await)) }
    });

    let mut partition = Partition::new();
    while let Some((host, verdict)) = fan.recv().await {
        let reachable: bool = match verdict {
            Ok(reachable) => reachable,
            Err(e) if e.is_fatal() => {
                fan.abort();
                return Err(e);
            }
            Err(e) => {
                warn!("{e}, treating {host} as stale");
                false
            }
        };
        debug!(%host, reachable, "probe finished");
        partition.record(LivenessResult::new(host, reachable));
    }
    fan.finish().await;

    for host in hosts {
        if !partition.contains(host) {
            warn!("No verdict for {host}, treating it as stale");
            partition.record(LivenessResult::new(*host, false));
        }
    }

    Ok(partition)
}
