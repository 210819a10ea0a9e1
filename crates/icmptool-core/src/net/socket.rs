use crate::error::IoResult as Result;
use std::net::SocketAddr;
use std::time::Duration;

#[cfg_attr(test, mockall::automock)]
pub trait Socket
where
    Self: Sized,
{
    /// Create a raw IPv4 socket for sending and receiving ICMP messages.
    fn new_icmp_raw_socket_ipv4() -> Result<Self>;
    /// Create an unprivileged datagram IPv4 socket for ICMP echo messages.
    fn new_icmp_dgram_socket_ipv4() -> Result<Self>;
    fn set_ttl(&mut self, ttl: u32) -> Result<()>;
    fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> Result<()>;
    /// Returns true if the socket becomes readable before the timeout, false otherwise.
    fn is_readable(&mut self, timeout: Duration) -> Result<bool>;
    fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, Option<SocketAddr>)>;
}
