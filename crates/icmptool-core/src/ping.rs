use crate::config::{IdentifierSource, PrivilegeMode, ReplyMatching, SocketKind};
use crate::diagnostics::DiagnosticsHandle;
use crate::error::Result;
use crate::interrupt::Interrupt;
use crate::matching::Outstanding;
use crate::net::transport::Transport;
use crate::net::{Network, SocketImpl};
use crate::probe::{Exchange, Probe, ProbeStatus};
use crate::types::{Sequence, TimeToLive};
use icmptool_packet::message::{random_payload, EchoKind, EchoMessage, IcmpMessage};
use std::net::Ipv4Addr;
use std::time::Duration;

/// An `ICMP` echo prober.
///
/// Use the [`crate::PingBuilder`] type to create a [`Pinger`].
#[derive(Debug, Clone)]
pub struct Pinger {
    destination: Ipv4Addr,
    count: usize,
    interval: Duration,
    timeout: Duration,
    ttl: TimeToLive,
    identifier: IdentifierSource,
    payload_size: usize,
    privilege_mode: PrivilegeMode,
    reply_matching: ReplyMatching,
    diagnostics: DiagnosticsHandle,
    interrupt: Interrupt,
}

impl Pinger {
    #[expect(clippy::too_many_arguments)]
    #[must_use]
    pub(crate) const fn new(
        destination: Ipv4Addr,
        count: usize,
        interval: Duration,
        timeout: Duration,
        ttl: TimeToLive,
        identifier: IdentifierSource,
        payload_size: usize,
        privilege_mode: PrivilegeMode,
        reply_matching: ReplyMatching,
        diagnostics: DiagnosticsHandle,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            destination,
            count,
            interval,
            timeout,
            ttl,
            identifier,
            payload_size,
            privilege_mode,
            reply_matching,
            diagnostics,
            interrupt,
        }
    }

    #[must_use]
    pub const fn destination(&self) -> Ipv4Addr {
        self.destination
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub const fn ttl(&self) -> TimeToLive {
        self.ttl
    }

    #[must_use]
    pub const fn identifier(&self) -> IdentifierSource {
        self.identifier
    }

    /// The size of the echo payload in bytes, excluding the `ICMP` header.
    #[must_use]
    pub const fn payload_size(&self) -> usize {
        self.payload_size
    }

    #[must_use]
    pub const fn privilege_mode(&self) -> PrivilegeMode {
        self.privilege_mode
    }

    #[must_use]
    pub const fn reply_matching(&self) -> ReplyMatching {
        self.reply_matching
    }

    /// Run the [`Pinger`] to completion.
    ///
    /// Blocks until `count` probes have been sent and answered (or timed out),
    /// or until the [`Interrupt`] is triggered.  Lost probes never fail the
    /// run, only the failure to open any socket does.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use icmptool_core::PingBuilder;
    /// use std::net::Ipv4Addr;
    ///
    /// let pinger = PingBuilder::new(Ipv4Addr::new(1, 1, 1, 1)).count(3).build()?;
    /// let result = pinger.run()?;
    /// println!("{}% packet loss", result.packet_loss());
    /// # Ok(())
    /// # }
    /// ```
    pub fn run(&self) -> Result<PingResult> {
        self.run_with(|_| ())
    }

    /// Run the [`Pinger`], calling `func` as each probe completes.
    pub fn run_with<F: FnMut(&Probe)>(&self, func: F) -> Result<PingResult> {
        let transport = Transport::<SocketImpl>::open(
            self.destination,
            self.privilege_mode,
            self.diagnostics.clone(),
        )?;
        Ok(self.run_on(transport, func))
    }

    /// Run over an already open network, which is released on return.
    pub(crate) fn run_on<N: Network, F: FnMut(&Probe)>(
        &self,
        mut network: N,
        mut func: F,
    ) -> PingResult {
        let kind = network.kind();
        let identifier = self.identifier.identifier();
        let payload = random_payload(self.payload_size);
        let exchange = Exchange {
            timeout: self.timeout,
            matching: self.reply_matching,
            diagnostics: &self.diagnostics,
        };
        let mut result = PingResult::new(self.destination, kind);
        network.set_ttl(self.ttl);
        for index in 0..self.count {
            if self.interrupt.is_triggered() || (index > 0 && !self.interrupt.sleep(self.interval))
            {
                self.diagnostics
                    .info(&format!("ping interrupted after {} probes", result.sent));
                result.interrupted = true;
                break;
            }
            let echo =
                EchoMessage::new(EchoKind::Request, identifier.0, index, payload.clone());
            let sequence = Sequence(echo.sequence());
            let outstanding = Outstanding {
                identifier,
                sequence,
                kind,
            };
            let probe = exchange.run(
                &mut network,
                &IcmpMessage::from(echo),
                &outstanding,
                Probe::new(sequence, self.ttl),
            );
            func(&probe);
            result.record(probe);
        }
        result
    }
}

/// The outcome of a ping run.
#[derive(Debug, Clone)]
pub struct PingResult {
    destination: Ipv4Addr,
    socket_kind: SocketKind,
    sent: usize,
    received: usize,
    lost: usize,
    rtts: Vec<Duration>,
    probes: Vec<Probe>,
    interrupted: bool,
}

impl PingResult {
    const fn new(destination: Ipv4Addr, socket_kind: SocketKind) -> Self {
        Self {
            destination,
            socket_kind,
            sent: 0,
            received: 0,
            lost: 0,
            rtts: Vec::new(),
            probes: Vec::new(),
            interrupted: false,
        }
    }

    /// Account for a completed probe.
    ///
    /// Only an `EchoReply` counts as received; everything else, including
    /// probes which could not be sent, counts as lost.
    fn record(&mut self, probe: Probe) {
        self.sent += 1;
        match (probe.status, probe.rtt) {
            (ProbeStatus::Replied, Some(rtt)) => {
                self.received += 1;
                self.rtts.push(rtt);
            }
            _ => self.lost += 1,
        }
        self.probes.push(probe);
        debug_assert_eq!(self.sent, self.received + self.lost);
    }

    #[must_use]
    pub const fn destination(&self) -> Ipv4Addr {
        self.destination
    }

    /// The kind of socket the run used.
    #[must_use]
    pub const fn socket_kind(&self) -> SocketKind {
        self.socket_kind
    }

    #[must_use]
    pub const fn sent(&self) -> usize {
        self.sent
    }

    #[must_use]
    pub const fn received(&self) -> usize {
        self.received
    }

    #[must_use]
    pub const fn lost(&self) -> usize {
        self.lost
    }

    /// The round trip times of received replies, in send order.
    #[must_use]
    pub fn rtts(&self) -> &[Duration] {
        &self.rtts
    }

    /// Every probe, in send order.
    #[must_use]
    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// Whether the run was stopped by an [`Interrupt`].
    #[must_use]
    pub const fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// The percentage of lost probes, `0.0` if nothing was sent.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn packet_loss(&self) -> f64 {
        if self.sent == 0 {
            0_f64
        } else {
            self.lost as f64 * 100_f64 / self.sent as f64
        }
    }

    #[must_use]
    pub fn min_rtt(&self) -> Option<Duration> {
        self.rtts.iter().min().copied()
    }

    #[must_use]
    pub fn max_rtt(&self) -> Option<Duration> {
        self.rtts.iter().max().copied()
    }

    #[must_use]
    pub fn avg_rtt(&self) -> Option<Duration> {
        let samples = u32::try_from(self.rtts.len()).ok().filter(|n| *n > 0)?;
        Some(self.rtts.iter().sum::<Duration>() / samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, IoError};
    use crate::net::{MockNetwork, Received};
    use icmptool_packet::icmpv4::{IcmpTimeExceededCode, IcmpType};
    use icmptool_packet::message::{ErrorMessage, ErrorType};
    use mockall::predicate;
    use std::io;
    use std::net::{IpAddr, SocketAddr};

    const DEST: Ipv4Addr = Ipv4Addr::new(5, 6, 7, 8);
    const ROUTER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    fn pinger(count: usize, reply_matching: ReplyMatching) -> Pinger {
        Pinger::new(
            DEST,
            count,
            Duration::ZERO,
            Duration::from_millis(100),
            TimeToLive(64),
            IdentifierSource::Fixed(1234),
            8,
            PrivilegeMode::Privileged,
            reply_matching,
            DiagnosticsHandle::default(),
            Interrupt::new(),
        )
    }

    fn echo_reply(sequence: u16) -> Received {
        Received {
            message: Some(
                EchoMessage::new(EchoKind::Reply, 1234, sequence, vec![0; 8]).into(),
            ),
            addr: Some(IpAddr::V4(DEST)),
            rtt: Some(Duration::from_millis(10 + u64::from(sequence))),
        }
    }

    fn network(kind: SocketKind) -> MockNetwork {
        let mut network = MockNetwork::new();
        network.expect_kind().return_const(kind);
        network
            .expect_set_ttl()
            .with(predicate::eq(TimeToLive(64)))
            .times(1)
            .return_const(());
        network
    }

    #[test]
    fn test_all_replies_received() {
        let mut network = network(SocketKind::Raw);
        network.expect_send().times(4).returning(|_| Ok(()));
        let mut sequence = 0;
        network
            .expect_receive_with_timeout()
            .times(4)
            .returning(move |_| {
                let reply = echo_reply(sequence);
                sequence += 1;
                Ok(reply)
            });
        let mut seen = vec![];
        let result = pinger(4, ReplyMatching::Temporal)
            .run_on(network, |probe| seen.push(probe.sequence));
        assert_eq!(4, result.sent());
        assert_eq!(4, result.received());
        assert_eq!(0, result.lost());
        assert_eq!(4, result.rtts().len());
        assert_eq!(4, result.probes().len());
        assert_eq!(
            vec![Sequence(0), Sequence(1), Sequence(2), Sequence(3)],
            seen
        );
        assert_eq!(0_f64, result.packet_loss());
        assert_eq!(Some(Duration::from_millis(10)), result.min_rtt());
        assert_eq!(Some(Duration::from_millis(13)), result.max_rtt());
        assert_eq!(Some(Duration::from_micros(11500)), result.avg_rtt());
        assert_eq!(SocketKind::Raw, result.socket_kind());
        assert!(!result.interrupted());
    }

    #[test]
    fn test_looped_back_requests_are_not_replies() {
        let mut network = network(SocketKind::Raw);
        network.expect_send().times(2).returning(|_| Ok(()));
        let mut calls = 0_u16;
        network
            .expect_receive_with_timeout()
            .times(4)
            .returning(move |_| {
                let sequence = calls / 2;
                let received = if calls % 2 == 0 {
                    Received {
                        message: Some(
                            EchoMessage::new(EchoKind::Request, 1234, sequence, vec![0; 8])
                                .into(),
                        ),
                        addr: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
                        rtt: Some(Duration::from_millis(1)),
                    }
                } else {
                    echo_reply(sequence)
                };
                calls += 1;
                Ok(received)
            });
        let result = pinger(2, ReplyMatching::Temporal).run_on(network, |_| ());
        assert_eq!(2, result.sent());
        assert_eq!(2, result.received());
        assert_eq!(0, result.lost());
        assert!(result
            .probes()
            .iter()
            .all(|p| p.status == ProbeStatus::Replied));
        assert_eq!(
            vec![Duration::from_millis(11), Duration::from_millis(12)],
            result.rtts()
        );
    }

    #[test]
    fn test_sends_increasing_sequences() {
        let mut network = network(SocketKind::Dgram);
        let mut expected = 0;
        network.expect_send().times(3).returning(move |message| {
            let IcmpMessage::Echo(echo) = message else {
                panic!("expected echo request");
            };
            assert_eq!(EchoKind::Request, echo.kind());
            assert_eq!(expected, echo.sequence());
            assert_eq!(1234, echo.identifier());
            assert_eq!(8, echo.payload().len());
            expected += 1;
            Ok(())
        });
        network
            .expect_receive_with_timeout()
            .times(3)
            .returning(|_| Ok(Received::timed_out()));
        let result = pinger(3, ReplyMatching::Temporal).run_on(network, |_| ());
        assert_eq!(3, result.sent());
        assert_eq!(0, result.received());
        assert_eq!(3, result.lost());
        assert!(result.rtts().is_empty());
        assert_eq!(100_f64, result.packet_loss());
        assert_eq!(None, result.avg_rtt());
    }

    #[test]
    fn test_error_reply_is_lost() {
        let mut network = network(SocketKind::Raw);
        network.expect_send().times(1).returning(|_| Ok(()));
        network
            .expect_receive_with_timeout()
            .times(1)
            .returning(|_| {
                Ok(Received {
                    message: Some(
                        ErrorMessage::new(
                            ErrorType::TimeExceeded(IcmpTimeExceededCode::TtlExpired),
                            vec![0; 28],
                        )
                        .into(),
                    ),
                    addr: Some(IpAddr::V4(ROUTER)),
                    rtt: Some(Duration::from_millis(3)),
                })
            });
        let result = pinger(1, ReplyMatching::Temporal).run_on(network, |_| ());
        assert_eq!(1, result.sent());
        assert_eq!(0, result.received());
        assert_eq!(1, result.lost());
        let probe = &result.probes()[0];
        assert_eq!(ProbeStatus::ErrorReceived, probe.status);
        assert_eq!(Some(IcmpType::TimeExceeded), probe.icmp_type);
        assert_eq!(Some(Duration::from_millis(3)), probe.rtt);
        assert_eq!(Some("Time to live exceeded in transit"), probe.cause);
    }

    #[test]
    fn test_send_failure_does_not_abort() {
        let mut network = network(SocketKind::Raw);
        let mut calls = 0;
        network.expect_send().times(3).returning(move |_| {
            calls += 1;
            if calls == 2 {
                Err(Error::IoError(IoError::SendTo(
                    io::Error::from(io::ErrorKind::Other),
                    SocketAddr::new(IpAddr::V4(DEST), 0),
                )))
            } else {
                Ok(())
            }
        });
        let mut sequence = 0;
        network
            .expect_receive_with_timeout()
            .times(2)
            .returning(move |_| {
                let reply = echo_reply(sequence);
                sequence += 2;
                Ok(reply)
            });
        let result = pinger(3, ReplyMatching::Temporal).run_on(network, |_| ());
        assert_eq!(3, result.sent());
        assert_eq!(2, result.received());
        assert_eq!(1, result.lost());
        assert_eq!(ProbeStatus::Failed, result.probes()[1].status);
    }

    #[test]
    fn test_strict_matching_skips_stale_reply() {
        let mut network = network(SocketKind::Raw);
        network.expect_send().times(1).returning(|_| Ok(()));
        let mut replies = vec![echo_reply(0), echo_reply(7)];
        network
            .expect_receive_with_timeout()
            .times(2)
            .returning(move |_| Ok(replies.pop().unwrap_or_default()));
        let result = pinger(1, ReplyMatching::Strict).run_on(network, |_| ());
        assert_eq!(1, result.received());
        assert_eq!(Some(Duration::from_millis(27)), result.rtts().first().copied());
    }

    #[test]
    fn test_interrupted_before_start() {
        let pinger = pinger(4, ReplyMatching::Temporal);
        pinger.interrupt.trigger();
        let mut network = network(SocketKind::Raw);
        network.expect_send().never();
        let result = pinger.run_on(network, |_| ());
        assert_eq!(0, result.sent());
        assert!(result.interrupted());
        assert_eq!(0_f64, result.packet_loss());
    }

    #[test]
    fn test_interrupted_during_run() {
        let pinger = pinger(4, ReplyMatching::Temporal);
        let interrupt = pinger.interrupt.clone();
        let mut network = network(SocketKind::Raw);
        network.expect_send().times(2).returning(|_| Ok(()));
        let mut sequence = 0;
        network
            .expect_receive_with_timeout()
            .times(2)
            .returning(move |_| {
                let reply = echo_reply(sequence);
                sequence += 1;
                Ok(reply)
            });
        let result = pinger.run_on(network, |probe| {
            if probe.sequence == Sequence(1) {
                interrupt.trigger();
            }
        });
        assert_eq!(2, result.sent());
        assert_eq!(2, result.received());
        assert!(result.interrupted());
    }
}
