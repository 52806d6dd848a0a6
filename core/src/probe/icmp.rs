use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use culler_common::error::CullError;
use culler_common::network::host::Host;
use culler_common::probe::LivenessProbe;
use culler_protocols::icmp;
use pnet::packet::icmp::IcmpPacket;
use pnet::transport::{IcmpTransportChannelIterator, TransportSender};

use super::tcp::TcpHandshakeProbe;
use crate::network::transport::{self, TransportType};

/// Raw ICMP echo probe for IPv4 hosts. IPv6 hosts go to the handshake probe.
pub struct IcmpProbe {
    count: u16,
    timeout: Duration,
    fallback: TcpHandshakeProbe,
}

impl IcmpProbe {
    pub fn new(count: u16, timeout: Duration, fallback: TcpHandshakeProbe) -> Self {
        Self {
            count,
            timeout,
            fallback,
        }
    }
}

#[async_trait]
impl LivenessProbe for IcmpProbe {
    async fn probe(&self, host: &Host) -> Result<bool, CullError> {
        let IpAddr::V4(target) = host.ip() else {
            return self.fallback.probe(host).await;
        };
        let (count, timeout) = (self.count, self.timeout);

        tokio::task::spawn_blocking(move || echo(target, count, timeout))
            .await
            .map_err(|e| CullError::Probe {
                host: target.to_string(),
                reason: e.to_string(),
            })?
    }

    fn name(&self) -> &'static str {
        "icmp-echo"
    }
}

/// Sends `count` echo requests spread over `timeout`, returning on the first reply.
fn echo(target: Ipv4Addr, count: u16, timeout: Duration) -> Result<bool, CullError> {
    let config_error = |reason: String| CullError::ProbeConfig {
        host: target.to_string(),
        reason,
    };
    if count == 0 {
        return Err(config_error("probe count must be at least 1".into()));
    }
    let deadline: Instant = Instant::now()
        .checked_add(timeout)
        .ok_or_else(|| config_error(format!("timeout of {}s is out of range", timeout.as_secs())))?;

    let (mut tx, mut rx) = transport::open_channel(TransportType::IcmpLayer4)
        .map_err(|e| config_error(format!("cannot open raw icmp channel: {e}")))?;
    let mut replies: IcmpTransportChannelIterator = pnet::transport::icmp_packet_iter(&mut rx);

    let identifier: u16 = rand::random();
    let interval: Duration = timeout / u32::from(count);

    for sequence in 0..count {
        send_request(&mut tx, target, identifier, sequence)?;

        let window_end: Instant = if sequence + 1 == count {
            deadline
        } else {
            Instant::now().checked_add(interval).map_or(deadline, |end| end.min(deadline))
        };
        if await_reply(&mut replies, target, identifier, window_end)? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            break;
        }
    }
    Ok(false)
}

fn send_request(
    tx: &mut TransportSender,
    target: Ipv4Addr,
    identifier: u16,
    sequence: u16,
) -> Result<(), CullError> {
    let bytes: Vec<u8> =
        icmp::create_echo_request(identifier, sequence).map_err(|e| CullError::ProbeConfig {
            host: target.to_string(),
            reason: e.to_string(),
        })?;
    let Some(packet) = IcmpPacket::new(&bytes) else {
        return Err(CullError::ProbeConfig {
            host: target.to_string(),
            reason: "echo request buffer too short".into(),
        });
    };

    tx.send_to(packet, IpAddr::V4(target))
        .map(|_| ())
        .map_err(|e| CullError::Probe {
            host: target.to_string(),
            reason: e.to_string(),
        })
}

fn await_reply(
    replies: &mut IcmpTransportChannelIterator,
    target: Ipv4Addr,
    identifier: u16,
    until: Instant,
) -> Result<bool, CullError> {
    loop {
        let remaining: Duration = until.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(false);
        }

        match replies.next_with_timeout(remaining) {
            Ok(Some((packet, source))) => {
                if source == IpAddr::V4(target) && icmp::echo_reply_identifier(&packet) == Some(identifier) {
                    return Ok(true);
                }
            }
            Ok(None) => return Ok(false),
            Err(e) => {
                return Err(CullError::Probe {
                    host: target.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
}
