//! `ICMPv4` wire format parsing and building.
//!
//! The crate offers two layers:
//!
//! - zero-copy packet views over byte slices ([`icmpv4`], [`ipv4`])
//! - owned [`IcmpMessage`](message::IcmpMessage) values with the
//!   [`encode`](message::encode), [`decode`](message::decode) and
//!   [`verify`](message::verify) codec functions
//!
//! # Endianness
//!
//! The internal representation is held in network byte order (big-endian) and
//! all accessor methods take and return data in host byte order, converting as
//! necessary for the given architecture.
//!
//! # Example
//!
//! The following example builds an `ICMPv4` echo request and parses it back:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use icmptool_packet::message::{decode, encode, verify, EchoKind, EchoMessage, IcmpMessage};
//!
//! let request = IcmpMessage::from(EchoMessage::new(EchoKind::Request, 1234, 10, b"ab".to_vec()));
//! let bytes = encode(&request);
//! assert_eq!(bytes, hex_literal::hex!("08 00 91 c1 04 d2 00 0a 61 62"));
//! assert!(verify(&request));
//! assert_eq!(request, decode(&bytes)?);
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod buffer;

/// Packet errors.
pub mod error;

/// Functions for calculating network checksums.
pub mod checksum;

/// `ICMPv4` packets.
pub mod icmpv4;

/// `IPv4` packets.
pub mod ipv4;

/// Owned `ICMPv4` messages.
pub mod message;

/// The IP packet next layer protocol.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IpProtocol {
    Icmp,
    Other(u8),
}

impl IpProtocol {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Icmp => 1,
            Self::Other(id) => id,
        }
    }
}

impl From<u8> for IpProtocol {
    fn from(id: u8) -> Self {
        match id {
            1 => Self::Icmp,
            p => Self::Other(p),
        }
    }
}

/// Format a payload as a hexadecimal string.
#[must_use]
pub fn fmt_payload(bytes: &[u8]) -> String {
    use itertools::Itertools as _;
    format!("{:02x}", bytes.iter().format(" "))
}
