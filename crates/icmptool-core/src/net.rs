use crate::config::SocketKind;
use crate::error::Result;
use crate::types::TimeToLive;
use icmptool_packet::message::IcmpMessage;
use std::net::IpAddr;
use std::time::Duration;

/// Platform specific network code.
mod platform;

/// A network socket.
mod socket;

/// A scoped ICMP socket.
pub mod transport;

/// The platform specific socket type.
pub use platform::SocketImpl;

/// The outcome of a single timed receive.
///
/// A timeout is represented by all fields being absent.  A message which
/// arrived but could not be decoded has an absent `message` with the sender
/// address and round trip time present.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Received {
    pub message: Option<IcmpMessage>,
    pub addr: Option<IpAddr>,
    pub rtt: Option<Duration>,
}

impl Received {
    #[must_use]
    pub const fn timed_out() -> Self {
        Self {
            message: None,
            addr: None,
            rtt: None,
        }
    }
}

/// An abstraction over an open `ICMP` transport.
#[cfg_attr(test, mockall::automock)]
pub trait Network {
    /// The kind of socket in use.
    fn kind(&self) -> SocketKind;

    /// Set the outgoing time-to-live.
    ///
    /// Failures are reported to diagnostics and the previous value is kept.
    fn set_ttl(&mut self, ttl: TimeToLive);

    /// Send an `ICMP` message to the destination.
    fn send(&mut self, message: &IcmpMessage) -> Result<()>;

    /// Wait at most `timeout` for the next `ICMP` message.
    fn receive_with_timeout(&mut self, timeout: Duration) -> Result<Received>;
}
