use crate::config::defaults;
use crate::diagnostics::{Diagnostics, DiagnosticsHandle};
use crate::error::Result;
use crate::{
    Error, IdentifierSource, Interrupt, Pinger, PrivilegeMode, ReplyMatching, TimeToLive, Tracer,
};
use icmptool_packet::message::MAX_PAYLOAD_SIZE;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Build a [`Pinger`].
///
/// # Examples
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// use icmptool_core::{PingBuilder, PrivilegeMode, ReplyMatching};
/// use std::net::Ipv4Addr;
/// use std::time::Duration;
///
/// let pinger = PingBuilder::new(Ipv4Addr::new(1, 1, 1, 1))
///     .count(10)
///     .interval(Duration::from_millis(200))
///     .privilege_mode(PrivilegeMode::Unprivileged)
///     .reply_matching(ReplyMatching::Strict)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PingBuilder {
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

impl PingBuilder {
    #[must_use]
    pub fn new(destination: Ipv4Addr) -> Self {
        Self {
            destination,
            count: defaults::DEFAULT_PING_COUNT,
            interval: defaults::DEFAULT_PING_INTERVAL,
            timeout: defaults::DEFAULT_TIMEOUT,
            ttl: TimeToLive(defaults::DEFAULT_PING_TTL),
            identifier: defaults::DEFAULT_IDENTIFIER_SOURCE,
            payload_size: defaults::DEFAULT_PAYLOAD_SIZE,
            privilege_mode: defaults::DEFAULT_PRIVILEGE_MODE,
            reply_matching: defaults::DEFAULT_REPLY_MATCHING,
            diagnostics: DiagnosticsHandle::default(),
            interrupt: Interrupt::new(),
        }
    }

    /// Set the number of echo requests to send.
    #[must_use]
    pub fn count(self, count: usize) -> Self {
        Self { count, ..self }
    }

    /// Set the pause between consecutive echo requests.
    #[must_use]
    pub fn interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    /// Set how long to wait for each reply.
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    #[must_use]
    pub fn ttl(self, ttl: u8) -> Self {
        Self {
            ttl: TimeToLive(ttl),
            ..self
        }
    }

    /// Set the source of the echo identifier.
    ///
    /// If not set then an identifier unique within the process is used.
    #[must_use]
    pub fn identifier(self, identifier: IdentifierSource) -> Self {
        Self { identifier, ..self }
    }

    /// Set the echo payload size in bytes.
    #[must_use]
    pub fn payload_size(self, payload_size: usize) -> Self {
        Self {
            payload_size,
            ..self
        }
    }

    #[must_use]
    pub fn privilege_mode(self, privilege_mode: PrivilegeMode) -> Self {
        Self {
            privilege_mode,
            ..self
        }
    }

    #[must_use]
    pub fn reply_matching(self, reply_matching: ReplyMatching) -> Self {
        Self {
            reply_matching,
            ..self
        }
    }

    /// Set the sink for operational messages.
    ///
    /// If not set then messages are discarded.
    #[must_use]
    pub fn diagnostics(self, diagnostics: impl Diagnostics + 'static) -> Self {
        Self {
            diagnostics: DiagnosticsHandle::new(diagnostics),
            ..self
        }
    }

    /// Set the token used to stop the run early.
    #[must_use]
    pub fn interrupt(self, interrupt: Interrupt) -> Self {
        Self { interrupt, ..self }
    }

    /// Build the [`Pinger`].
    ///
    /// Fails with [`Error::BadConfig`] if the ttl is zero or the payload size
    /// exceeds the maximum.
    pub fn build(self) -> Result<Pinger> {
        if self.ttl.0 == 0 {
            return Err(Error::BadConfig(String::from("ttl must be at least 1")));
        }
        validate_payload_size(self.payload_size)?;
        Ok(Pinger::new(
            self.destination,
            self.count,
            self.interval,
            self.timeout,
            self.ttl,
            self.identifier,
            self.payload_size,
            self.privilege_mode,
            self.reply_matching,
            self.diagnostics,
            self.interrupt,
        ))
    }
}

/// Build a [`Tracer`].
///
/// # Examples
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// use icmptool_core::TraceBuilder;
/// use std::net::Ipv4Addr;
///
/// let tracer = TraceBuilder::new(Ipv4Addr::new(1, 1, 1, 1))
///     .first_ttl(2)
///     .max_ttl(20)
///     .attempts(1)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TraceBuilder {
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

impl TraceBuilder {
    #[must_use]
    pub fn new(destination: Ipv4Addr) -> Self {
        Self {
            destination,
            attempts: defaults::DEFAULT_TRACE_ATTEMPTS,
            interval: defaults::DEFAULT_TRACE_INTERVAL,
            timeout: defaults::DEFAULT_TIMEOUT,
            first_ttl: TimeToLive(defaults::DEFAULT_TRACE_FIRST_TTL),
            max_ttl: TimeToLive(defaults::DEFAULT_TRACE_MAX_TTL),
            identifier: defaults::DEFAULT_IDENTIFIER_SOURCE,
            payload_size: defaults::DEFAULT_PAYLOAD_SIZE,
            privilege_mode: defaults::DEFAULT_PRIVILEGE_MODE,
            reply_matching: defaults::DEFAULT_REPLY_MATCHING,
            diagnostics: DiagnosticsHandle::default(),
            interrupt: Interrupt::new(),
        }
    }

    /// Set the number of probes sent per hop.
    #[must_use]
    pub fn attempts(self, attempts: usize) -> Self {
        Self { attempts, ..self }
    }

    /// Set the pause after each probe.
    #[must_use]
    pub fn interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Set the time-to-live of the first hop probed.
    #[must_use]
    pub fn first_ttl(self, first_ttl: u8) -> Self {
        Self {
            first_ttl: TimeToLive(first_ttl),
            ..self
        }
    }

    /// Set the time-to-live of the last hop probed.
    #[must_use]
    pub fn max_ttl(self, max_ttl: u8) -> Self {
        Self {
            max_ttl: TimeToLive(max_ttl),
            ..self
        }
    }

    #[must_use]
    pub fn identifier(self, identifier: IdentifierSource) -> Self {
        Self { identifier, ..self }
    }

    #[must_use]
    pub fn payload_size(self, payload_size: usize) -> Self {
        Self {
            payload_size,
            ..self
        }
    }

    #[must_use]
    pub fn privilege_mode(self, privilege_mode: PrivilegeMode) -> Self {
        Self {
            privilege_mode,
            ..self
        }
    }

    #[must_use]
    pub fn reply_matching(self, reply_matching: ReplyMatching) -> Self {
        Self {
            reply_matching,
            ..self
        }
    }

    #[must_use]
    pub fn diagnostics(self, diagnostics: impl Diagnostics + 'static) -> Self {
        Self {
            diagnostics: DiagnosticsHandle::new(diagnostics),
            ..self
        }
    }

    #[must_use]
    pub fn interrupt(self, interrupt: Interrupt) -> Self {
        Self { interrupt, ..self }
    }

    /// Build the [`Tracer`].
    pub fn build(self) -> Result<Tracer> {
        if self.attempts == 0 {
            return Err(Error::BadConfig(String::from(
                "attempts must be at least 1",
            )));
        }
        if self.first_ttl.0 == 0 {
            return Err(Error::BadConfig(String::from(
                "first_ttl must be at least 1",
            )));
        }
        if self.first_ttl > self.max_ttl {
            return Err(Error::BadConfig(format!(
                "first_ttl {} > max_ttl {}",
                self.first_ttl, self.max_ttl
            )));
        }
        validate_payload_size(self.payload_size)?;
        Ok(Tracer::new(
            self.destination,
            self.attempts,
            self.interval,
            self.timeout,
            self.first_ttl,
            self.max_ttl,
            self.identifier,
            self.payload_size,
            self.privilege_mode,
            self.reply_matching,
            self.diagnostics,
            self.interrupt,
        ))
    }
}

fn validate_payload_size(payload_size: usize) -> Result<()> {
    if payload_size > MAX_PAYLOAD_SIZE {
        Err(Error::BadConfig(format!(
            "payload_size {payload_size} > {MAX_PAYLOAD_SIZE}"
        )))
    } else {
        Ok(())
    }
}
