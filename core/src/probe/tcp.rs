use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use culler_common::error::CullError;
use culler_common::network::host::Host;
use culler_common::probe::LivenessProbe;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Unprivileged probe: a host is alive if any port accepts or actively refuses a connection.
#[derive(Debug, Clone)]
pub struct TcpHandshakeProbe {
    ports: Vec<u16>,
    timeout: Duration,
}

impl TcpHandshakeProbe {
    pub fn new(ports: Vec<u16>, timeout: Duration) -> Self {
        Self { ports, timeout }
    }
}

#[async_trait]
impl LivenessProbe for TcpHandshakeProbe {
    async fn probe(&self, host: &Host) -> Result<bool, CullError> {
        if self.ports.is_empty() {
            return Err(CullError::ProbeConfig {
                host: host.to_string(),
                reason: "no ports configured for handshake probing".into(),
            });
        }

        let mut attempts: JoinSet<bool> = JoinSet::new();
        for port in &self.ports {
            attempts.spawn(handshake(SocketAddr::new(host.ip(), *port)));
        }

        let any_answer = async move {
            while let Some(joined) = attempts.join_next().await {
                if let Ok(true) = joined {
                    return true;
                }
            }
            false
        };

        match timeout(self.timeout, any_answer).await {
            Ok(reachable) => Ok(reachable),
            Err(_elapsed) => Ok(false),
        }
    }

    fn name(&self) -> &'static str {
        "tcp-handshake"
    }
}

async fn handshake(addr: SocketAddr) -> bool {
    match TcpStream::connect(addr).await {
        Ok(_) => true,
        Err(e) => e.kind() == ErrorKind::ConnectionRefused,
    }
}
