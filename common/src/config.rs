use std::time::Duration;

/// Echo requests sent to each host.
pub const DEFAULT_PROBE_COUNT: u16 = 4;
/// Overall time budget of a single host probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Longest per-host timeout accepted from the command line, in seconds.
pub const MAX_PROBE_TIMEOUT_SECS: u64 = 3600;
/// Ports tried, in order, by the unprivileged handshake probe.
pub const DEFAULT_TCP_PORTS: [u16; 3] = [443, 80, 22];

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub count: u16,
    pub timeout: Duration,
    pub tcp_ports: Vec<u16>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            count: DEFAULT_PROBE_COUNT,
            timeout: DEFAULT_PROBE_TIMEOUT,
            tcp_ports: DEFAULT_TCP_PORTS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// 0 prints everything, 1 drops headers and trees, 2 prints only the summary.
    pub quiet: u8,
    pub probe: ProbeSettings,
    /// Upper bound on concurrently running tasks in every phase.
    ///
    /// `None` spawns one task per work item.
    pub max_tasks: Option<usize>,
    /// Use the handshake probe even when raw sockets are available.
    pub force_tcp: bool,
    /// Stop after matching; the store is never edited.
    pub dry_run: bool,
    /// Skip the confirmation prompt before removal.
    pub assume_yes: bool,
}
