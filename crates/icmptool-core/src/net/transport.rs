use crate::config::{PrivilegeMode, SocketKind};
use crate::diagnostics::DiagnosticsHandle;
use crate::error::{Error, ErrorKind, Result};
use crate::net::socket::Socket;
use crate::net::{Network, Received, SocketImpl};
use crate::types::TimeToLive;
use icmptool_packet::ipv4::payload_after_header;
use icmptool_packet::message::{decode, encode, IcmpMessage};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tracing::instrument;

/// The size of the receive buffer, large enough for any `IPv4` datagram.
const MAX_DATAGRAM_SIZE: usize = 65535;

/// An `ICMP` transport to a single destination.
///
/// The transport owns exactly one socket which is released when the
/// transport is closed or dropped, whichever happens first.
pub struct Transport<S: Socket = SocketImpl> {
    socket: Option<S>,
    kind: SocketKind,
    destination: SocketAddr,
    diagnostics: DiagnosticsHandle,
    buf: Vec<u8>,
}

impl<S: Socket> Transport<S> {
    /// Open a transport to `destination`.
    ///
    /// In `Privileged` mode a raw socket is tried first and, if permission is
    /// denied, a datagram socket is used instead.  The fallback is reported
    /// to diagnostics and is visible via [`Transport::kind`].
    ///
    /// Fails if no socket could be created.
    #[instrument(skip(diagnostics), level = "trace")]
    pub fn open(
        destination: Ipv4Addr,
        privilege_mode: PrivilegeMode,
        diagnostics: DiagnosticsHandle,
    ) -> Result<Self> {
        let (socket, kind) = match privilege_mode {
            PrivilegeMode::Privileged => match S::new_icmp_raw_socket_ipv4() {
                Ok(socket) => (socket, SocketKind::Raw),
                Err(raw) if raw.kind() == ErrorKind::Std(io::ErrorKind::PermissionDenied) => {
                    diagnostics.warn(&format!(
                        "raw ICMP socket unavailable ({raw}), falling back to a datagram socket which cannot observe ICMP error replies"
                    ));
                    let socket = S::new_icmp_dgram_socket_ipv4()
                        .map_err(|dgram| Error::SocketUnavailable { raw, dgram })?;
                    (socket, SocketKind::Dgram)
                }
                Err(err) => return Err(Error::IoError(err)),
            },
            PrivilegeMode::Unprivileged => (S::new_icmp_dgram_socket_ipv4()?, SocketKind::Dgram),
        };
        diagnostics.debug(&format!("opened {kind} ICMP socket to {destination}"));
        Ok(Self {
            socket: Some(socket),
            kind,
            destination: SocketAddr::new(IpAddr::V4(destination), 0),
            diagnostics,
            buf: vec![0; MAX_DATAGRAM_SIZE],
        })
    }

    /// The kind of socket in use.
    #[must_use]
    pub const fn kind(&self) -> SocketKind {
        self.kind
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Set the outgoing time-to-live, keeping the previous value on failure.
    pub fn set_ttl(&mut self, ttl: TimeToLive) {
        let Some(socket) = self.socket.as_mut() else {
            self.diagnostics
                .warn(&format!("cannot set ttl {ttl} on a closed transport"));
            return;
        };
        if let Err(err) = socket.set_ttl(u32::from(ttl.0)) {
            self.diagnostics
                .warn(&format!("failed to set ttl {ttl}: {err}"));
        }
    }

    /// Encode and send a message to the destination.
    pub fn send(&mut self, message: &IcmpMessage) -> Result<()> {
        let socket = self.socket.as_mut().ok_or(Error::NoSocket)?;
        socket.send_to(&encode(message), self.destination)?;
        Ok(())
    }

    /// Wait at most `timeout` for the next `ICMP` message.
    ///
    /// A timeout is not an error and yields [`Received::timed_out`].  The
    /// round trip time spans the wait and the read.
    pub fn receive_with_timeout(&mut self, timeout: Duration) -> Result<Received> {
        let socket = self.socket.as_mut().ok_or(Error::NoSocket)?;
        let start = Instant::now();
        if !socket.is_readable(timeout)? {
            return Ok(Received::timed_out());
        }
        let (bytes_read, addr) = socket.recv_from(&mut self.buf)?;
        let rtt = start.elapsed();
        let datagram = &self.buf[..bytes_read];
        let bytes = if self.kind.strips_ip_header() {
            payload_after_header(datagram)
        } else {
            datagram
        };
        let message = match decode(bytes) {
            Ok(message) => Some(message),
            Err(err) => {
                self.diagnostics.debug(&format!(
                    "discarding undecodable message from {}: {err}",
                    addr.map_or_else(|| String::from("unknown"), |addr| addr.ip().to_string())
                ));
                None
            }
        };
        Ok(Received {
            message,
            addr: addr.map(|addr| addr.ip()),
            rtt: Some(rtt),
        })
    }

    /// Release the socket.  Closing a closed transport does nothing.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            self.diagnostics
                .debug(&format!("closed {} ICMP socket", self.kind));
        }
    }
}

impl<S: Socket> Network for Transport<S> {
    fn kind(&self) -> SocketKind {
        Self::kind(self)
    }

    fn set_ttl(&mut self, ttl: TimeToLive) {
        Self::set_ttl(self, ttl);
    }

    fn send(&mut self, message: &IcmpMessage) -> Result<()> {
        Self::send(self, message)
    }

    fn receive_with_timeout(&mut self, timeout: Duration) -> Result<Received> {
        Self::receive_with_timeout(self, timeout)
    }
}

impl<S: Socket> Drop for Transport<S> {
    fn drop(&mut self) {
        self.close();
    }
}
