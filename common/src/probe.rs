use async_trait::async_trait;

use crate::error::CullError;
use crate::network::host::Host;

/// Decides whether a host still answers on the network.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Returns `Ok(true)` when at least one reply came back within the timeout.
    ///
    /// Silence is `Ok(false)`, never an error. [`CullError::ProbeConfig`] means the
    /// probe could not be set up at all; any other error is a transient failure.
    async fn probe(&self, host: &Host) -> Result<bool, CullError>;

    fn name(&self) -> &'static str;
}
