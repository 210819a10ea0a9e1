use crate::config::ReplyMatching;
use crate::diagnostics::DiagnosticsHandle;
use crate::matching::{receive_reply, Outstanding};
use crate::net::{Network, Received};
use crate::types::{Sequence, TimeToLive};
use icmptool_packet::icmpv4::{IcmpCode, IcmpType};
use icmptool_packet::message::{EchoKind, IcmpMessage};
use std::net::IpAddr;
use std::time::Duration;

/// The state of a `Probe`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ProbeStatus {
    /// The request has been sent and no outcome is known yet.
    Sent,
    /// An `EchoReply` was received.
    Replied,
    /// An `ICMP` error (`TimeExceeded`, `DestinationUnreachable` or
    /// `ParameterProblem`) was received.
    ErrorReceived,
    /// An `EchoRequest` was received, such as our own request looped back
    /// to a raw socket.
    Unexpected,
    /// Nothing usable arrived within the timeout.
    ///
    /// Messages which could not be decoded are reported as `NoReply`.
    NoReply,
    /// The request could not be sent or the receive failed locally.
    Failed,
}

/// A single request/response attempt.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Probe {
    pub sequence: Sequence,
    pub ttl: TimeToLive,
    pub status: ProbeStatus,
    /// The address of the responder, if any.
    pub addr: Option<IpAddr>,
    pub rtt: Option<Duration>,
    pub icmp_type: Option<IcmpType>,
    pub icmp_code: Option<IcmpCode>,
    /// The human readable cause of an `ICMP` error reply.
    pub cause: Option<&'static str>,
}

impl Probe {
    #[must_use]
    pub const fn new(sequence: Sequence, ttl: TimeToLive) -> Self {
        Self {
            sequence,
            ttl,
            status: ProbeStatus::Sent,
            addr: None,
            rtt: None,
            icmp_type: None,
            icmp_code: None,
            cause: None,
        }
    }

    /// Finalize the probe with the outcome of a receive.
    #[must_use]
    pub fn complete(self, received: Received) -> Self {
        let Some(message) = received.message else {
            return Self {
                status: ProbeStatus::NoReply,
                ..self
            };
        };
        let (status, cause) = match &message {
            IcmpMessage::Echo(echo) => match echo.kind() {
                EchoKind::Reply => (ProbeStatus::Replied, None),
                EchoKind::Request => (ProbeStatus::Unexpected, None),
            },
            IcmpMessage::Error(error) => (ProbeStatus::ErrorReceived, Some(error.cause())),
        };
        Self {
            status,
            addr: received.addr,
            rtt: received.rtt,
            icmp_type: Some(message.icmp_type()),
            icmp_code: Some(message.icmp_code()),
            cause,
            ..self
        }
    }

    /// Finalize the probe as locally failed.
    #[must_use]
    pub const fn failed(self) -> Self {
        Self {
            status: ProbeStatus::Failed,
            ..self
        }
    }

    /// Whether the probe produced a reply from `addr` that counts as arrival.
    #[must_use]
    pub fn is_reply_from(&self, addr: IpAddr) -> bool {
        self.status == ProbeStatus::Replied && self.addr == Some(addr)
    }
}

/// The parameters of one send and receive cycle.
pub(crate) struct Exchange<'a> {
    pub timeout: Duration,
    pub matching: ReplyMatching,
    pub diagnostics: &'a DiagnosticsHandle,
}

impl Exchange<'_> {
    /// Send `message` and wait for its reply.
    ///
    /// Local send and receive failures are reported to diagnostics and yield
    /// a `Failed` probe rather than an error.
    pub fn run<N: Network>(
        &self,
        network: &mut N,
        message: &IcmpMessage,
        outstanding: &Outstanding,
        probe: Probe,
    ) -> Probe {
        if let Err(err) = network.send(message) {
            self.diagnostics.warn(&format!(
                "failed to send probe {} with ttl {}: {err}",
                probe.sequence, probe.ttl
            ));
            return probe.failed();
        }
        match receive_reply(
            network,
            self.timeout,
            self.matching,
            outstanding,
            self.diagnostics,
        ) {
            Ok(received) => probe.complete(received),
            Err(err) => {
                self.diagnostics.warn(&format!(
                    "failed to receive reply to probe {} with ttl {}: {err}",
                    probe.sequence, probe.ttl
                ));
                probe.failed()
            }
        }
    }
}
