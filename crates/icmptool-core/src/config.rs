use crate::types::TraceId;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU16, Ordering};

/// Default values for configuration.
pub mod defaults {
    use crate::{IdentifierSource, PrivilegeMode, ReplyMatching};
    use std::time::Duration;

    /// The default value for `unprivileged`.
    pub const DEFAULT_PRIVILEGE_MODE: PrivilegeMode = PrivilegeMode::Privileged;

    /// The default value for `reply-matching`.
    pub const DEFAULT_REPLY_MATCHING: ReplyMatching = ReplyMatching::Temporal;

    /// The default value for `identifier`.
    pub const DEFAULT_IDENTIFIER_SOURCE: IdentifierSource = IdentifierSource::ProcessUnique;

    /// The default value for `timeout`.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    /// The default value for `payload-size`.
    pub const DEFAULT_PAYLOAD_SIZE: usize = icmptool_packet::message::DEFAULT_PAYLOAD_SIZE;

    /// The default value for ping `count`.
    pub const DEFAULT_PING_COUNT: usize = 4;

    /// The default value for ping `interval`.
    pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(1);

    /// The default value for ping `ttl`.
    pub const DEFAULT_PING_TTL: u8 = 64;

    /// The default value for trace `attempts`.
    pub const DEFAULT_TRACE_ATTEMPTS: usize = 3;

    /// The default value for trace `interval`.
    pub const DEFAULT_TRACE_INTERVAL: Duration = Duration::from_millis(500);

    /// The default value for trace `first-ttl`.
    pub const DEFAULT_TRACE_FIRST_TTL: u8 = 1;

    /// The default value for trace `max-ttl`.
    pub const DEFAULT_TRACE_MAX_TTL: u8 = 30;
}

/// The privilege mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PrivilegeMode {
    /// Prefer a raw socket, falling back to a datagram socket if permission is denied.
    Privileged,
    /// Use a datagram socket only.
    Unprivileged,
}

impl PrivilegeMode {
    #[must_use]
    pub const fn is_unprivileged(self) -> bool {
        match self {
            Self::Privileged => false,
            Self::Unprivileged => true,
        }
    }
}

impl Display for PrivilegeMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Privileged => write!(f, "privileged"),
            Self::Unprivileged => write!(f, "unprivileged"),
        }
    }
}

/// The kind of `ICMP` socket a transport holds.
///
/// The kind determines what can be observed:
///
/// - `Raw` sockets see every `ICMP` message addressed to the host, including
///   `TimeExceeded` and `DestinationUnreachable` errors from intermediate
///   routers.  Received datagrams start with the `IPv4` header.
/// - `Dgram` sockets only exchange `EchoRequest` / `EchoReply` messages, the
///   kernel rewrites the echo identifier and received data starts at the
///   `ICMP` header.  Intermediate hops of a trace cannot be observed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SocketKind {
    Raw,
    Dgram,
}

impl SocketKind {
    /// Whether received data is prefixed by an `IPv4` header.
    #[must_use]
    pub const fn strips_ip_header(self) -> bool {
        match self {
            Self::Raw => true,
            Self::Dgram => false,
        }
    }

    /// Whether `ICMP` error messages can be received.
    #[must_use]
    pub const fn observes_errors(self) -> bool {
        match self {
            Self::Raw => true,
            Self::Dgram => false,
        }
    }
}

impl Display for SocketKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Dgram => write!(f, "datagram"),
        }
    }
}

/// How a received message is paired with the outstanding probe.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ReplyMatching {
    /// The first message received within the timeout is the reply.
    Temporal,
    /// Only a message which refers to the outstanding probe is the reply.
    ///
    /// Echo replies must carry the probe sequence (and identifier, for raw
    /// sockets) and error messages must quote the original echo request.
    /// Other messages are discarded and the wait continues for the remainder
    /// of the timeout.
    Strict,
}

impl Display for ReplyMatching {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Temporal => write!(f, "temporal"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// The source of the `ICMP` echo identifier for a run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IdentifierSource {
    /// A caller supplied identifier.
    Fixed(u16),
    /// An identifier unique within this process, seeded from the process id.
    ProcessUnique,
}

impl IdentifierSource {
    /// Produce the identifier for a new run.
    #[must_use]
    pub fn identifier(self) -> TraceId {
        static NEXT: AtomicU16 = AtomicU16::new(0);
        match self {
            Self::Fixed(id) => TraceId(id),
            Self::ProcessUnique => {
                let offset = NEXT.fetch_add(1, Ordering::Relaxed);
                TraceId((std::process::id() as u16).wrapping_add(offset))
            }
        }
    }
}
