//! Owned `ICMPv4` messages and the codec which converts them to and from bytes.
//!
//! An [`IcmpMessage`] is either an [`EchoMessage`] (request or reply) or an
//! [`ErrorMessage`] (`DestinationUnreachable`, `TimeExceeded` or
//! `ParameterProblem`).  Messages are immutable once built and always carry a
//! valid checksum derived from their fields.

use crate::checksum::{icmp_ipv4_checksum, verify_icmp_ipv4_checksum};
use crate::error::{Error, Result};
use crate::icmpv4::echo::EchoPacket;
use crate::icmpv4::error::IcmpErrorPacket;
use crate::icmpv4::{
    IcmpCode, IcmpDestinationUnreachableCode, IcmpPacket, IcmpTimeExceededCode, IcmpType,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, warn};

/// The size of the fixed `ICMP` header.
pub const HEADER_SIZE: usize = 8;

/// The maximum size of an `ICMP` message accepted by [`decode`].
pub const MAX_MESSAGE_SIZE: usize = 65508;

/// The maximum payload size of an echo message.
pub const MAX_PAYLOAD_SIZE: usize = MAX_MESSAGE_SIZE - HEADER_SIZE;

/// The size of the payload used when none is given.
pub const DEFAULT_PAYLOAD_SIZE: usize = 56;

/// The sequence number substituted for an out of range sequence.
const FALLBACK_SEQUENCE: u16 = 1;

/// An `ICMPv4` message.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum IcmpMessage {
    Echo(EchoMessage),
    Error(ErrorMessage),
}

impl IcmpMessage {
    #[must_use]
    pub const fn icmp_type(&self) -> IcmpType {
        match self {
            Self::Echo(echo) => echo.icmp_type(),
            Self::Error(error) => error.icmp_type(),
        }
    }

    #[must_use]
    pub const fn icmp_code(&self) -> IcmpCode {
        match self {
            Self::Echo(_) => IcmpCode(0),
            Self::Error(error) => error.icmp_code(),
        }
    }

    #[must_use]
    pub const fn checksum(&self) -> u16 {
        match self {
            Self::Echo(echo) => echo.checksum,
            Self::Error(error) => error.checksum,
        }
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Echo(echo) => &echo.payload,
            Self::Error(error) => &error.payload,
        }
    }

    /// The size of the encoded message in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload().len()
    }
}

impl From<EchoMessage> for IcmpMessage {
    fn from(echo: EchoMessage) -> Self {
        Self::Echo(echo)
    }
}

impl From<ErrorMessage> for IcmpMessage {
    fn from(error: ErrorMessage) -> Self {
        Self::Error(error)
    }
}

/// The direction of an echo message.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EchoKind {
    Request,
    Reply,
}

/// An `EchoRequest` or `EchoReply` message.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EchoMessage {
    kind: EchoKind,
    identifier: u16,
    sequence: u16,
    payload: Vec<u8>,
    checksum: u16,
}

impl EchoMessage {
    /// Build an echo message.
    ///
    /// A `sequence` outside `0..=65535` is replaced with `1` and a payload
    /// larger than [`MAX_PAYLOAD_SIZE`] is replaced with a random payload of
    /// [`DEFAULT_PAYLOAD_SIZE`] bytes.
    #[must_use]
    pub fn new<S: TryInto<u16>>(
        kind: EchoKind,
        identifier: u16,
        sequence: S,
        payload: Vec<u8>,
    ) -> Self {
        let sequence = sequence.try_into().unwrap_or_else(|_| {
            debug!(sequence = FALLBACK_SEQUENCE, "echo sequence out of range");
            FALLBACK_SEQUENCE
        });
        let payload = if payload.len() > MAX_PAYLOAD_SIZE {
            warn!(
                size = payload.len(),
                max = MAX_PAYLOAD_SIZE,
                "echo payload too large, using a random payload"
            );
            random_payload(DEFAULT_PAYLOAD_SIZE)
        } else {
            payload
        };
        let mut echo = Self {
            kind,
            identifier,
            sequence,
            payload,
            checksum: 0,
        };
        echo.checksum = checksum_of(pack_echo(&echo), &echo.payload);
        echo
    }

    /// Build an `EchoRequest` with a random payload of [`DEFAULT_PAYLOAD_SIZE`] bytes.
    #[must_use]
    pub fn request<S: TryInto<u16>>(identifier: u16, sequence: S) -> Self {
        Self::new(
            EchoKind::Request,
            identifier,
            sequence,
            random_payload(DEFAULT_PAYLOAD_SIZE),
        )
    }

    #[must_use]
    pub const fn kind(&self) -> EchoKind {
        self.kind
    }

    #[must_use]
    pub const fn icmp_type(&self) -> IcmpType {
        match self.kind {
            EchoKind::Request => IcmpType::EchoRequest,
            EchoKind::Reply => IcmpType::EchoReply,
        }
    }

    #[must_use]
    pub const fn identifier(&self) -> u16 {
        self.identifier
    }

    #[must_use]
    pub const fn sequence(&self) -> u16 {
        self.sequence
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub const fn checksum(&self) -> u16 {
        self.checksum
    }
}

/// The type and code of an `ICMP` error message.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorType {
    DestinationUnreachable(IcmpDestinationUnreachableCode),
    TimeExceeded(IcmpTimeExceededCode),
    ParameterProblem { code: IcmpCode, pointer: u8 },
}

impl ErrorType {
    #[must_use]
    pub const fn icmp_type(&self) -> IcmpType {
        match self {
            Self::DestinationUnreachable(_) => IcmpType::DestinationUnreachable,
            Self::TimeExceeded(_) => IcmpType::TimeExceeded,
            Self::ParameterProblem { .. } => IcmpType::ParameterProblem,
        }
    }

    #[must_use]
    pub const fn icmp_code(&self) -> IcmpCode {
        match self {
            Self::DestinationUnreachable(code) => IcmpCode(code.id()),
            Self::TimeExceeded(code) => IcmpCode(code.id()),
            Self::ParameterProblem { code, .. } => *code,
        }
    }

    /// A human readable description of the error.
    #[must_use]
    pub const fn cause(&self) -> &'static str {
        match self {
            Self::DestinationUnreachable(code) => match code {
                IcmpDestinationUnreachableCode::NetUnreachable => "Net unreachable",
                IcmpDestinationUnreachableCode::HostUnreachable => "Host unreachable",
                IcmpDestinationUnreachableCode::ProtocolUnreachable => "Protocol unreachable",
                IcmpDestinationUnreachableCode::PortUnreachable => "Port unreachable",
                IcmpDestinationUnreachableCode::FragmentationNeeded => {
                    "Fragmentation needed and DF set"
                }
                IcmpDestinationUnreachableCode::SourceRouteFailed => "Source route failed",
                IcmpDestinationUnreachableCode::Unknown(_) => "Destination unreachable",
            },
            Self::TimeExceeded(code) => match code {
                IcmpTimeExceededCode::TtlExpired => "Time to live exceeded in transit",
                IcmpTimeExceededCode::FragmentReassembly => "Fragment reassembly time exceeded",
                IcmpTimeExceededCode::Unknown(_) => "Time exceeded",
            },
            Self::ParameterProblem { .. } => "Parameter problem",
        }
    }
}

/// A `DestinationUnreachable`, `TimeExceeded` or `ParameterProblem` message.
///
/// The payload holds the start of the datagram which caused the error.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ErrorMessage {
    error_type: ErrorType,
    payload: Vec<u8>,
    checksum: u16,
}

impl ErrorMessage {
    #[must_use]
    pub fn new(error_type: ErrorType, payload: Vec<u8>) -> Self {
        let mut error = Self {
            error_type,
            payload,
            checksum: 0,
        };
        error.checksum = checksum_of(pack_error(&error), &error.payload);
        error
    }

    #[must_use]
    pub const fn error_type(&self) -> ErrorType {
        self.error_type
    }

    #[must_use]
    pub const fn icmp_type(&self) -> IcmpType {
        self.error_type.icmp_type()
    }

    #[must_use]
    pub const fn icmp_code(&self) -> IcmpCode {
        self.error_type.icmp_code()
    }

    /// The `ParameterProblem` pointer.
    #[must_use]
    pub const fn pointer(&self) -> Option<u8> {
        match self.error_type {
            ErrorType::ParameterProblem { pointer, .. } => Some(pointer),
            _ => None,
        }
    }

    #[must_use]
    pub const fn cause(&self) -> &'static str {
        self.error_type.cause()
    }

    /// The original datagram fragment.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub const fn checksum(&self) -> u16 {
        self.checksum
    }
}

/// Serialize a message, computing the checksum over the header (with the
/// checksum field zeroed) and the payload.
#[must_use]
pub fn encode(message: &IcmpMessage) -> Vec<u8> {
    let (mut header, payload) = match message {
        IcmpMessage::Echo(echo) => (pack_echo(echo), echo.payload()),
        IcmpMessage::Error(error) => (pack_error(error), error.payload()),
    };
    let checksum = checksum_of(header, payload);
    header[2..4].copy_from_slice(&checksum.to_be_bytes());
    assemble(header, payload)
}

/// Parse a message.
///
/// Fails if the input is not longer than the header, exceeds
/// [`MAX_MESSAGE_SIZE`], has an unsupported type or a bad checksum.  The code
/// of an echo message is not validated and is always decoded as zero.
pub fn decode(bytes: &[u8]) -> Result<IcmpMessage> {
    if bytes.len() <= HEADER_SIZE {
        return Err(Error::PacketTooShort(bytes.len()));
    }
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(Error::PacketTooLong(bytes.len()));
    }
    let packet = IcmpPacket::new_view(bytes)?;
    let icmp_type = packet.get_icmp_type();
    if let IcmpType::Other(id) = icmp_type {
        return Err(Error::UnsupportedType(id));
    }
    let expected = icmp_ipv4_checksum(bytes);
    let actual = packet.get_checksum();
    if expected != actual {
        return Err(Error::ChecksumMismatch { expected, actual });
    }
    Ok(match icmp_type {
        IcmpType::EchoRequest | IcmpType::EchoReply => {
            let echo = EchoPacket::new_view(bytes)?;
            let kind = if icmp_type == IcmpType::EchoRequest {
                EchoKind::Request
            } else {
                EchoKind::Reply
            };
            if echo.get_icmp_code() != IcmpCode(0) {
                debug!(code = echo.get_icmp_code().0, "ignoring non-zero echo code");
            }
            IcmpMessage::Echo(EchoMessage::new(
                kind,
                echo.get_identifier(),
                echo.get_sequence(),
                echo.payload().to_vec(),
            ))
        }
        IcmpType::DestinationUnreachable | IcmpType::TimeExceeded | IcmpType::ParameterProblem => {
            let error = IcmpErrorPacket::new_view(bytes)?;
            let code = error.get_icmp_code();
            let error_type = match icmp_type {
                IcmpType::DestinationUnreachable => {
                    ErrorType::DestinationUnreachable(IcmpDestinationUnreachableCode::from(code))
                }
                IcmpType::TimeExceeded => ErrorType::TimeExceeded(IcmpTimeExceededCode::from(code)),
                _ => ErrorType::ParameterProblem {
                    code,
                    pointer: error.get_pointer(),
                },
            };
            IcmpMessage::Error(ErrorMessage::new(error_type, error.payload().to_vec()))
        }
        IcmpType::Other(id) => return Err(Error::UnsupportedType(id)),
    })
}

/// Verify the checksum carried by a message.
///
/// The sum is recomputed over the header with the checksum field populated
/// and the payload, and the message is valid iff it folds to `0xFFFF`.
#[must_use]
pub fn verify(message: &IcmpMessage) -> bool {
    let bytes = match message {
        IcmpMessage::Echo(echo) => assemble(pack_echo(echo), echo.payload()),
        IcmpMessage::Error(error) => assemble(pack_error(error), error.payload()),
    };
    verify_icmp_ipv4_checksum(&bytes)
}

/// Generate a random alphanumeric payload.
#[must_use]
pub fn random_payload(size: usize) -> Vec<u8> {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(size)
        .collect()
}

/// Pack the echo header: type, code, checksum, identifier and sequence.
fn pack_echo(echo: &EchoMessage) -> [u8; HEADER_SIZE] {
    let [id_hi, id_lo] = echo.identifier.to_be_bytes();
    let [seq_hi, seq_lo] = echo.sequence.to_be_bytes();
    let [sum_hi, sum_lo] = echo.checksum.to_be_bytes();
    [
        echo.icmp_type().id(),
        0,
        sum_hi,
        sum_lo,
        id_hi,
        id_lo,
        seq_hi,
        seq_lo,
    ]
}

/// Pack the error header: type, code, checksum, pointer and reserved bytes.
///
/// The pointer byte is zero for all types other than `ParameterProblem`.
fn pack_error(error: &ErrorMessage) -> [u8; HEADER_SIZE] {
    let [sum_hi, sum_lo] = error.checksum.to_be_bytes();
    let pointer = error.pointer().unwrap_or(0);
    [
        error.icmp_type().id(),
        error.icmp_code().0,
        sum_hi,
        sum_lo,
        pointer,
        0,
        0,
        0,
    ]
}

fn assemble(header: [u8; HEADER_SIZE], payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(payload);
    bytes
}

fn checksum_of(header: [u8; HEADER_SIZE], payload: &[u8]) -> u16 {
    icmp_ipv4_checksum(&assemble(header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use test_case::test_case;

    fn echo_request(sequence: u16, payload: &[u8]) -> IcmpMessage {
        IcmpMessage::Echo(EchoMessage::new(
            EchoKind::Request,
            1234,
            sequence,
            payload.to_vec(),
        ))
    }

    #[test]
    fn test_encode_echo_request() {
        let message = echo_request(10, b"ab");
        assert_eq!(
            hex!("08 00 91 c1 04 d2 00 0a 61 62").as_slice(),
            encode(&message)
        );
        assert_eq!(0x91c1, message.checksum());
    }

    #[test]
    fn test_encode_odd_payload_pads_checksum_only() {
        let message = echo_request(10, b"a");
        let bytes = encode(&message);
        assert_eq!(9, bytes.len());
        assert_eq!(hex!("08 00 92 23 04 d2 00 0a 61").as_slice(), bytes);
        assert!(verify(&message));
    }

    #[test]
    fn test_encode_time_exceeded() {
        let message = IcmpMessage::Error(ErrorMessage::new(
            ErrorType::TimeExceeded(IcmpTimeExceededCode::TtlExpired),
            hex!("45 00").to_vec(),
        ));
        assert_eq!(hex!("0b 00 af ff 00 00 00 00 45 00").as_slice(), encode(&message));
        assert_eq!(10, message.size());
    }

    #[test]
    fn test_encode_parameter_problem() {
        let message = IcmpMessage::Error(ErrorMessage::new(
            ErrorType::ParameterProblem {
                code: IcmpCode(0),
                pointer: 9,
            },
            vec![0x45],
        ));
        let bytes = encode(&message);
        assert_eq!(hex!("0c 00"), bytes[0..2]);
        assert_eq!(hex!("09 00 00 00 45"), bytes[4..]);
        assert_eq!(Some(9), decode(&bytes).ok().and_then(|m| match m {
            IcmpMessage::Error(error) => error.pointer(),
            IcmpMessage::Echo(_) => None,
        }));
    }

    #[test_case(1)]
    #[test_case(56)]
    #[test_case(65500)]
    fn test_echo_round_trip(size: usize) {
        let payload = random_payload(size);
        let request = echo_request(7, &payload);
        assert_eq!(request, decode(&encode(&request)).unwrap());
        let reply = IcmpMessage::Echo(EchoMessage::new(EchoKind::Reply, 1, 65535, payload));
        assert_eq!(reply, decode(&encode(&reply)).unwrap());
    }

    #[test_case(ErrorType::DestinationUnreachable(IcmpDestinationUnreachableCode::PortUnreachable), 1)]
    #[test_case(ErrorType::DestinationUnreachable(IcmpDestinationUnreachableCode::Unknown(13)), 56)]
    #[test_case(ErrorType::TimeExceeded(IcmpTimeExceededCode::FragmentReassembly), 56)]
    #[test_case(ErrorType::ParameterProblem { code: IcmpCode(1), pointer: 3 }, 65500)]
    fn test_error_round_trip(error_type: ErrorType, size: usize) {
        let message = IcmpMessage::Error(ErrorMessage::new(error_type, vec![0x5a; size]));
        assert_eq!(message, decode(&encode(&message)).unwrap());
        assert!(verify(&message));
    }

    #[test]
    fn test_decode_empty_payload() {
        let message = echo_request(1, &[]);
        assert_eq!(Err(Error::PacketTooShort(8)), decode(&encode(&message)));
    }

    #[test_case(0)]
    #[test_case(1)]
    #[test_case(8)]
    fn test_decode_too_short(len: usize) {
        let buf = vec![0_u8; len];
        assert_eq!(Err(Error::PacketTooShort(len)), decode(&buf));
    }

    #[test]
    fn test_decode_too_long() {
        let buf = vec![0_u8; MAX_MESSAGE_SIZE + 1];
        assert_eq!(Err(Error::PacketTooLong(MAX_MESSAGE_SIZE + 1)), decode(&buf));
    }

    #[test]
    fn test_decode_max_length() {
        let message = echo_request(1, &vec![0_u8; MAX_PAYLOAD_SIZE]);
        assert_eq!(MAX_MESSAGE_SIZE, encode(&message).len());
        assert!(decode(&encode(&message)).is_ok());
    }

    #[test_case(1)]
    #[test_case(4)]
    #[test_case(5)]
    #[test_case(13)]
    #[test_case(255)]
    fn test_decode_unsupported_type(icmp_type: u8) {
        let mut buf = hex!("00 00 00 00 04 d2 00 0a 61 62");
        buf[0] = icmp_type;
        let checksum = icmp_ipv4_checksum(&buf);
        buf[2..4].copy_from_slice(&checksum.to_be_bytes());
        assert_eq!(Err(Error::UnsupportedType(icmp_type)), decode(&buf));
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let buf = hex!("08 00 91 c2 04 d2 00 0a 61 62");
        assert_eq!(
            Err(Error::ChecksumMismatch {
                expected: 0x91c1,
                actual: 0x91c2
            }),
            decode(&buf)
        );
    }

    #[test]
    fn test_decode_echo_code_normalized() {
        let mut buf = hex!("00 07 00 00 04 d2 00 0a 61 62");
        let checksum = icmp_ipv4_checksum(&buf);
        buf[2..4].copy_from_slice(&checksum.to_be_bytes());
        let message = decode(&buf).unwrap();
        assert_eq!(IcmpCode(0), message.icmp_code());
        assert_eq!(hex!("00 00"), encode(&message)[0..2]);
        assert!(verify(&message));
    }

    #[test]
    fn test_decode_destination_unreachable() {
        let message = decode(&hex!("03 01 fc fe 00 00 00 00 00 00")).unwrap();
        let IcmpMessage::Error(error) = message else {
            panic!("expected error message");
        };
        assert_eq!(
            ErrorType::DestinationUnreachable(IcmpDestinationUnreachableCode::HostUnreachable),
            error.error_type()
        );
        assert_eq!("Host unreachable", error.cause());
        assert_eq!(None, error.pointer());
    }

    #[test]
    fn test_verify_encoded_messages() {
        for size in [1, 2, 56, 1000] {
            let message = echo_request(3, &random_payload(size));
            assert!(verify(&message));
            assert!(verify_icmp_ipv4_checksum(&encode(&message)));
        }
    }

    #[test]
    fn test_verify_rejects_bad_checksum() {
        let IcmpMessage::Echo(mut echo) = echo_request(3, b"abc") else {
            unreachable!()
        };
        echo.checksum ^= 0x0100;
        assert!(!verify(&IcmpMessage::Echo(echo)));
    }

    #[test]
    fn test_single_bit_corruption_detected() {
        let bytes = encode(&echo_request(42, &random_payload(DEFAULT_PAYLOAD_SIZE)));
        for bit in 0..bytes.len() * 8 {
            let mut corrupted = bytes.clone();
            corrupted[bit / 8] ^= 1 << (bit % 8);
            assert!(!verify_icmp_ipv4_checksum(&corrupted), "bit {bit}");
            assert!(decode(&corrupted).is_err(), "bit {bit}");
        }
    }

    #[test_case(65536_u32)]
    #[test_case(u32::MAX)]
    fn test_sequence_out_of_range(sequence: u32) {
        let echo = EchoMessage::new(EchoKind::Request, 1, sequence, vec![1]);
        assert_eq!(1, echo.sequence());
    }

    #[test]
    fn test_sequence_negative() {
        let echo = EchoMessage::new(EchoKind::Request, 1, -5_i32, vec![1]);
        assert_eq!(1, echo.sequence());
        let echo = EchoMessage::new(EchoKind::Request, 1, 0_i32, vec![1]);
        assert_eq!(0, echo.sequence());
    }

    #[test]
    fn test_oversized_payload_replaced() {
        let echo = EchoMessage::new(EchoKind::Request, 1, 1, vec![0; MAX_PAYLOAD_SIZE + 1]);
        assert_eq!(DEFAULT_PAYLOAD_SIZE, echo.payload().len());
        assert!(echo.payload().iter().all(u8::is_ascii_alphanumeric));
    }

    #[test]
    fn test_request_default_payload() {
        let echo = EchoMessage::request(9, 2);
        assert_eq!(EchoKind::Request, echo.kind());
        assert_eq!(9, echo.identifier());
        assert_eq!(2, echo.sequence());
        assert_eq!(DEFAULT_PAYLOAD_SIZE, echo.payload().len());
        assert_eq!(64, IcmpMessage::from(echo).size());
    }

    #[test_case(ErrorType::DestinationUnreachable(IcmpDestinationUnreachableCode::NetUnreachable), "Net unreachable")]
    #[test_case(ErrorType::DestinationUnreachable(IcmpDestinationUnreachableCode::ProtocolUnreachable), "Protocol unreachable")]
    #[test_case(ErrorType::DestinationUnreachable(IcmpDestinationUnreachableCode::PortUnreachable), "Port unreachable")]
    #[test_case(ErrorType::DestinationUnreachable(IcmpDestinationUnreachableCode::FragmentationNeeded), "Fragmentation needed and DF set")]
    #[test_case(ErrorType::DestinationUnreachable(IcmpDestinationUnreachableCode::SourceRouteFailed), "Source route failed")]
    #[test_case(ErrorType::TimeExceeded(IcmpTimeExceededCode::TtlExpired), "Time to live exceeded in transit")]
    #[test_case(ErrorType::TimeExceeded(IcmpTimeExceededCode::FragmentReassembly), "Fragment reassembly time exceeded")]
    #[test_case(ErrorType::ParameterProblem { code: IcmpCode(0), pointer: 1 }, "Parameter problem")]
    fn test_cause(error_type: ErrorType, expected: &str) {
        assert_eq!(expected, error_type.cause());
    }
}
