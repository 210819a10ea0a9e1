use thiserror::Error;

/// A packet error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A packet error.
///
/// All variants other than `InsufficientPacketBuffer` are produced by
/// [`decode`](crate::message::decode) and are recoverable: the caller treats
/// the message as absent.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum Error {
    /// Attempting to create a packet with an insufficient buffer size.
    #[error("insufficient buffer for {0} packet, minimum={1}, provided={2}")]
    InsufficientPacketBuffer(String, usize, usize),
    /// The message is too short to hold an `ICMP` header and a payload.
    #[error("packet too short: {0} bytes")]
    PacketTooShort(usize),
    /// The message exceeds the maximum `ICMP` message size.
    #[error("packet too long: {0} bytes")]
    PacketTooLong(usize),
    /// The `ICMP` type is not one of the supported types.
    #[error("unsupported icmp type: {0}")]
    UnsupportedType(u8),
    /// The checksum in the message does not match the computed checksum.
    #[error("checksum mismatch, expected={expected:#06x}, actual={actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },
}
