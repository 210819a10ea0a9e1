//! Internet checksum (RFC 1071) for `ICMPv4` messages.

/// The word index of the checksum field within an `ICMP` header.
const CHECKSUM_WORD: usize = 1;

/// Calculate the checksum for an `Ipv4` `ICMP` packet.
///
/// The checksum field (the second 16-bit word) is treated as zero and an odd
/// trailing byte is padded with a zero byte.
#[must_use]
pub fn icmp_ipv4_checksum(data: &[u8]) -> u16 {
    if data.is_empty() {
        return 0;
    }
    !sum_be_words(data, Some(CHECKSUM_WORD))
}

/// Verify the checksum of an `Ipv4` `ICMP` packet.
///
/// The sum is computed over every word including the populated checksum
/// field and is valid iff the folded sum is `0xFFFF`.
///
/// Note that one's complement arithmetic has two representations of zero
/// and so a corruption which flips a word between `0x0000` and `0xFFFF` is
/// not detected.
#[must_use]
pub fn verify_icmp_ipv4_checksum(data: &[u8]) -> bool {
    sum_be_words(data, None) == 0xFFFF
}

/// Sum the big-endian 16-bit words of `data`, folding the carry after every
/// addition.
fn sum_be_words(data: &[u8], ignore_word: Option<usize>) -> u16 {
    let mut sum = 0_u32;
    for (i, word) in data.chunks(2).enumerate() {
        if Some(i) == ignore_word {
            continue;
        }
        let value = match *word {
            [hi, lo] => u16::from_be_bytes([hi, lo]),
            [hi] => u16::from_be_bytes([hi, 0]),
            _ => 0,
        };
        sum += u32::from(value);
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_empty_checksum() {
        assert_eq!(0, icmp_ipv4_checksum(&[]));
    }

    #[test]
    fn test_odd_length() {
        assert_eq!(0xFEFF, icmp_ipv4_checksum(&[0x01]));
        assert_eq!(
            icmp_ipv4_checksum(&hex!("08 00 00 00 00 01 00 01 61")),
            icmp_ipv4_checksum(&hex!("08 00 00 00 00 01 00 01 61 00"))
        );
    }

    #[test]
    fn test_echo_request_checksum() {
        let bytes = hex!("08 00 f3 23 04 d2 00 0a");
        assert_eq!(0xf323, icmp_ipv4_checksum(&bytes));
        assert!(verify_icmp_ipv4_checksum(&bytes));
    }

    #[test]
    fn test_checksum_field_ignored() {
        let zeroed = hex!("08 00 00 00 04 d2 00 0a");
        let populated = hex!("08 00 ab cd 04 d2 00 0a");
        assert_eq!(icmp_ipv4_checksum(&zeroed), icmp_ipv4_checksum(&populated));
    }

    #[test]
    fn test_carry_folding() {
        let bytes = hex!("ff ff 00 00 ff ff 00 02");
        assert_eq!(!0x0002, icmp_ipv4_checksum(&bytes));
    }

    #[test]
    fn test_time_exceeded_checksum() {
        let mut bytes = [0_u8; 92];
        bytes[..40].copy_from_slice(&hex!(
            "0b 00 88 eb 00 00 00 00 45 00 00 54 b0 de 00 00 01 11 75 21
             c0 a8 01 c9 8e fa 42 2e 62 57 81 95 00 40 87 e7 00 00 00 00"
        ));
        assert_eq!(35051, icmp_ipv4_checksum(&bytes));
        assert!(verify_icmp_ipv4_checksum(&bytes));
    }

    #[test]
    fn test_verify_detects_corruption() {
        let mut bytes = hex!("08 00 f3 23 04 d2 00 0a");
        bytes[5] ^= 0x01;
        assert!(!verify_icmp_ipv4_checksum(&bytes));
    }
}
