use crate::config::{IdentifierSource, PrivilegeMode, ReplyMatching, SocketKind};
use crate::diagnostics::DiagnosticsHandle;
use crate::error::Result;
use crate::interrupt::Interrupt;
use crate::matching::Outstanding;
use crate::net::transport::Transport;
use crate::net::{Network, SocketImpl};
use crate::probe::{Exchange, Probe};
use crate::types::{Sequence, TimeToLive};
use icmptool_packet::message::{random_payload, EchoKind, EchoMessage, IcmpMessage};
use indexmap::IndexMap;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// A traceroute implementation.
///
/// Probes are sent with an increasing time-to-live, starting at `first_ttl`,
/// until an `EchoReply` from the destination is received or `max_ttl` has
/// been probed.  Every probe uses a freshly opened transport.
///
/// Use the [`crate::TraceBuilder`] type to create a [`Tracer`].
#[derive(Debug, Clone)]
pub struct Tracer {
    destination: Ipv4Addr,
    attempts: usize,
    interval: Duration,
    timeout: Duration,
    first_ttl: TimeToLive,
    max_ttl: TimeToLive,
    identifier: IdentifierSource,
    payload_size: usize,
    privilege_mode: PrivilegeMode,
    reply_matching: ReplyMatching,
    diagnostics: DiagnosticsHandle,
    interrupt: Interrupt,
}

impl Tracer {
    #[expect(clippy::too_many_arguments)]
    #[must_use]
    pub(crate) const fn new(
        destination: Ipv4Addr,
        attempts: usize,
        interval: Duration,
        timeout: Duration,
        first_ttl: TimeToLive,
        max_ttl: TimeToLive,
        identifier: IdentifierSource,
        payload_size: usize,
        privilege_mode: PrivilegeMode,
        reply_matching: ReplyMatching,
        diagnostics: DiagnosticsHandle,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            destination,
            attempts,
            interval,
            timeout,
            first_ttl,
            max_ttl,
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
    pub const fn attempts(&self) -> usize {
        self.attempts
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
    pub const fn first_ttl(&self) -> TimeToLive {
        self.first_ttl
    }

    #[must_use]
    pub const fn max_ttl(&self) -> TimeToLive {
        self.max_ttl
    }

    #[must_use]
    pub const fn identifier(&self) -> IdentifierSource {
        self.identifier
    }

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

    /// Run the [`Tracer`] to completion.
    ///
    /// Fails only if the first transport cannot be opened. A later open
    /// failure is recorded as a `Failed` probe.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use icmptool_core::TraceBuilder;
    /// use std::net::Ipv4Addr;
    ///
    /// let tracer = TraceBuilder::new(Ipv4Addr::new(1, 1, 1, 1))
    ///     .max_ttl(16)
    ///     .build()?;
    /// let result = tracer.run()?;
    /// for hop in result.hops() {
    ///     println!("{} {:?}", hop.ttl(), hop.addr());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn run(&self) -> Result<TracerouteResult> {
        self.run_with(|_| ())
    }

    /// Run the [`Tracer`], calling `func` as each hop completes.
    pub fn run_with<F: FnMut(&Hop)>(&self, func: F) -> Result<TracerouteResult> {
        self.run_on(
            || {
                Transport::<SocketImpl>::open(
                    self.destination,
                    self.privilege_mode,
                    self.diagnostics.clone(),
                )
            },
            func,
        )
    }

    pub(crate) fn run_on<N, O, F>(&self, mut open: O, mut func: F) -> Result<TracerouteResult>
    where
        N: Network,
        O: FnMut() -> Result<N>,
        F: FnMut(&Hop),
    {
        let identifier = self.identifier.identifier();
        let payload = random_payload(self.payload_size);
        let destination = IpAddr::V4(self.destination);
        let exchange = Exchange {
            timeout: self.timeout,
            matching: self.reply_matching,
            diagnostics: &self.diagnostics,
        };
        let mut result = TracerouteResult::new(self.destination);
        let mut sequence = Sequence(1);
        let mut ttl = self.first_ttl;
        loop {
            let mut hop = Hop::new(ttl);
            for _ in 0..self.attempts {
                if self.interrupt.is_triggered() {
                    result.interrupted = true;
                    break;
                }
                let probe = match open() {
                    Ok(mut network) => {
                        let kind = network.kind();
                        if result.socket_kind.is_none() {
                            result.socket_kind = Some(kind);
                            if !kind.observes_errors() {
                                self.diagnostics.warn(
                                    "tracing with a datagram socket, intermediate hops will not be observed",
                                );
                            }
                        }
                        network.set_ttl(ttl);
                        let echo = EchoMessage::new(
                            EchoKind::Request,
                            identifier.0,
                            sequence.0,
                            payload.clone(),
                        );
                        let outstanding = Outstanding {
                            identifier,
                            sequence,
                            kind,
                        };
                        exchange.run(
                            &mut network,
                            &IcmpMessage::from(echo),
                            &outstanding,
                            Probe::new(sequence, ttl),
                        )
                    }
                    Err(err) if result.socket_kind.is_some() => {
                        self.diagnostics.warn(&format!(
                            "failed to open transport for probe {sequence} with ttl {ttl}: {err}"
                        ));
                        Probe::new(sequence, ttl).failed()
                    }
                    Err(err) => return Err(err),
                };
                sequence = Sequence(sequence.0.wrapping_add(1));
                let reached = probe.is_reply_from(destination);
                hop.probes.push(probe);
                if reached {
                    result.reached = true;
                    break;
                }
                if !self.interrupt.sleep(self.interval) {
                    result.interrupted = true;
                    break;
                }
            }
            if !(result.interrupted && hop.probes.is_empty()) {
                func(&hop);
                result.hops.push(hop);
            }
            if result.reached || result.interrupted || ttl >= self.max_ttl {
                break;
            }
            ttl += TimeToLive(1);
        }
        if result.interrupted {
            self.diagnostics.info(&format!(
                "trace interrupted after {} hops",
                result.hops.len()
            ));
        }
        Ok(result)
    }
}

/// One time-to-live level of a trace.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Hop {
    ttl: TimeToLive,
    probes: Vec<Probe>,
}

impl Hop {
    const fn new(ttl: TimeToLive) -> Self {
        Self {
            ttl,
            probes: Vec::new(),
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> TimeToLive {
        self.ttl
    }

    /// The probes of this hop, in attempt order.
    #[must_use]
    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// The address of the first probe which received a response.
    #[must_use]
    pub fn addr(&self) -> Option<IpAddr> {
        self.probes.iter().find_map(|probe| probe.addr)
    }

    /// The round trip times of this hop grouped by responder, in the order
    /// the responders were first seen.
    #[must_use]
    pub fn address_rtts(&self) -> IndexMap<IpAddr, Vec<Duration>> {
        self.probes
            .iter()
            .filter_map(|probe| probe.addr.zip(probe.rtt))
            .fold(IndexMap::new(), |mut map, (addr, rtt)| {
                map.entry(addr).or_default().push(rtt);
                map
            })
    }
}

/// The outcome of a trace.
#[derive(Debug, Clone)]
pub struct TracerouteResult {
    destination: Ipv4Addr,
    hops: Vec<Hop>,
    reached: bool,
    interrupted: bool,
    socket_kind: Option<SocketKind>,
}

impl TracerouteResult {
    const fn new(destination: Ipv4Addr) -> Self {
        Self {
            destination,
            hops: Vec::new(),
            reached: false,
            interrupted: false,
            socket_kind: None,
        }
    }

    #[must_use]
    pub const fn destination(&self) -> Ipv4Addr {
        self.destination
    }

    /// The hops of the trace in increasing time-to-live order.
    #[must_use]
    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    /// Whether an `EchoReply` from the destination was received.
    #[must_use]
    pub const fn reached(&self) -> bool {
        self.reached
    }

    #[must_use]
    pub const fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// The kind of socket used, absent if no probe was sent.
    #[must_use]
    pub const fn socket_kind(&self) -> Option<SocketKind> {
        self.socket_kind
    }
}
