use anyhow::Context;
use pnet::packet::Packet;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{self, IcmpCode, IcmpPacket, IcmpTypes};

/// Type, code, checksum, identifier and sequence number.
pub const ECHO_HDR_LEN: usize = 8;
const PAYLOAD: &[u8] = b"culler-liveness!";

pub fn create_echo_request(identifier: u16, sequence: u16) -> anyhow::Result<Vec<u8>> {
    let mut buffer: Vec<u8> = vec![0u8; ECHO_HDR_LEN + PAYLOAD.len()];
    {
        let mut echo: MutableEchoRequestPacket =
            MutableEchoRequestPacket::new(&mut buffer).context("creating icmp echo request")?;
        echo.set_icmp_type(IcmpTypes::EchoRequest);
        echo.set_icmp_code(IcmpCode(0));
        echo.set_identifier(identifier);
        echo.set_sequence_number(sequence);
        echo.set_payload(PAYLOAD);
        echo.set_checksum(0);
    }

    let csum: u16 = {
        let packet = IcmpPacket::new(&buffer).context("reading back icmp echo request")?;
        icmp::checksum(&packet)
    };
    MutableEchoRequestPacket::new(&mut buffer)
        .context("creating icmp echo request")?
        .set_checksum(csum);

    Ok(buffer)
}

/// Returns the identifier of an echo reply, or `None` for any other ICMP message.
pub fn echo_reply_identifier(packet: &IcmpPacket) -> Option<u16> {
    if packet.get_icmp_type() != IcmpTypes::EchoReply {
        return None;
    }
    EchoReplyPacket::new(packet.packet()).map(|reply| reply.get_identifier())
}
