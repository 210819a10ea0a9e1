use crate::config::{ReplyMatching, SocketKind};
use crate::diagnostics::DiagnosticsHandle;
use crate::error::Result;
use crate::net::{Network, Received};
use crate::types::{Sequence, TraceId};
use icmptool_packet::icmpv4::echo::EchoPacket;
use icmptool_packet::icmpv4::IcmpType;
use icmptool_packet::ipv4::Ipv4Packet;
use icmptool_packet::message::{EchoKind, IcmpMessage};
use icmptool_packet::IpProtocol;
use std::time::Duration;

/// The probe a reply is awaited for.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Outstanding {
    pub identifier: TraceId,
    pub sequence: Sequence,
    pub kind: SocketKind,
}

impl Outstanding {
    /// Whether `message` refers to this probe.
    ///
    /// Datagram sockets rewrite the echo identifier so only the sequence is
    /// compared for them.
    #[must_use]
    pub fn matches(&self, message: &IcmpMessage) -> bool {
        match message {
            IcmpMessage::Echo(echo) => {
                echo.kind() == EchoKind::Reply
                    && self.is_probe(echo.identifier(), echo.sequence())
            }
            IcmpMessage::Error(error) => {
                let Ok(inner) = Ipv4Packet::new_view(error.payload()) else {
                    return false;
                };
                if inner.get_protocol() != IpProtocol::Icmp {
                    return false;
                }
                let Ok(echo) = EchoPacket::new_view(inner.payload()) else {
                    return false;
                };
                echo.get_icmp_type() == IcmpType::EchoRequest
                    && self.is_probe(echo.get_identifier(), echo.get_sequence())
            }
        }
    }

    fn is_probe(&self, identifier: u16, sequence: u16) -> bool {
        let identifier_matches = match self.kind {
            SocketKind::Raw => identifier == self.identifier.0,
            SocketKind::Dgram => true,
        };
        identifier_matches && sequence == self.sequence.0
    }
}

/// Wait at most `timeout` for the reply to `outstanding`.
///
/// An `EchoRequest` is never a reply.  Raw sockets see our own requests
/// looped back, so they are discarded under either matching mode.
///
/// With `Temporal` matching the first other message (or timeout) received
/// is returned as is.  With `Strict` matching messages which do not refer to
/// the outstanding probe are discarded as well.  In both modes the wait
/// continues for the remaining time after a discard and the returned round
/// trip time covers all of it.
pub fn receive_reply<N: Network>(
    network: &mut N,
    timeout: Duration,
    matching: ReplyMatching,
    outstanding: &Outstanding,
    diagnostics: &DiagnosticsHandle,
) -> Result<Received> {
    let mut waited = Duration::ZERO;
    loop {
        let remaining = timeout.saturating_sub(waited);
        let received = network.receive_with_timeout(remaining)?;
        let Some(rtt) = received.rtt else {
            return Ok(received);
        };
        waited += rtt;
        let is_reply = match (&received.message, matching) {
            (Some(message), _) if is_echo_request(message) => false,
            (_, ReplyMatching::Temporal) => true,
            (Some(message), ReplyMatching::Strict) => outstanding.matches(message),
            (None, ReplyMatching::Strict) => false,
        };
        if is_reply {
            return Ok(Received {
                rtt: Some(waited),
                ..received
            });
        }
        if let Some(message) = &received.message {
            diagnostics.debug(&format!(
                "discarding {:?} message while waiting for sequence {}",
                message.icmp_type(),
                outstanding.sequence
            ));
        }
        if waited >= timeout {
            return Ok(Received::timed_out());
        }
    }
}

fn is_echo_request(message: &IcmpMessage) -> bool {
    matches!(message, IcmpMessage::Echo(echo) if echo.kind() == EchoKind::Request)
}
