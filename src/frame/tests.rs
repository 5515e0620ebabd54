//! Tests for header parsing, length fields and masking.

use bytes::BytesMut;
use rstest::rstest;

use super::*;
use crate::error::ProtocolError;

#[rstest]
#[case(0x0, Opcode::Continuation)]
#[case(0x1, Opcode::Text)]
#[case(0x2, Opcode::Binary)]
#[case(0x8, Opcode::Close)]
#[case(0x9, Opcode::Ping)]
#[case(0xA, Opcode::Pong)]
fn known_opcodes_parse(#[case] bits: u8, #[case] expected: Opcode) {
    assert_eq!(Opcode::try_from(bits), Ok(expected));
    assert_eq!(expected.as_u8(), bits);
}

#[rstest]
#[case(0x3)]
#[case(0x7)]
#[case(0xB)]
#[case(0xF)]
fn reserved_opcodes_are_rejected(#[case] bits: u8) {
    assert_eq!(
        Opcode::try_from(bits),
        Err(ProtocolError::UnknownOpcode { opcode: bits })
    );
}

#[test]
fn control_opcodes_are_classified() {
    assert!(Opcode::Close.is_control());
    assert!(Opcode::Ping.is_control());
    assert!(Opcode::Pong.is_control());
    assert!(!Opcode::Text.is_control());
    assert!(!Opcode::Continuation.is_message_start());
    assert!(Opcode::Binary.is_message_start());
}

#[test]
fn header_fields_are_split() {
    let header = FrameHeader::parse([0x4a, 0x7e]);
    assert!(!header.fin);
    assert!(header.rsv1);
    assert_eq!(header.reserved_bits(), 0x40);
    assert_eq!(header.opcode_bits, 0xA);
    assert!(!header.masked);
    assert_eq!(header.extended_length_size(), 2);
    assert_eq!(header.mask_key_size(), 0);
}

#[test]
fn sixteen_bit_length_is_read() {
    assert_eq!(parse_extended_length(&[0x01, 0x00]), Ok(256));
}

#[test]
fn sixty_four_bit_length_within_32_bits_is_read() {
    assert_eq!(
        parse_extended_length(&[0, 0, 0, 0, 0, 1, 0, 0]),
        Ok(65_536)
    );
}

#[test]
fn sixty_four_bit_length_with_high_word_is_rejected() {
    assert_eq!(
        parse_extended_length(&[0, 0, 0, 1, 0, 0, 0, 0]),
        Err(ProtocolError::PayloadTooLarge { length: 1 << 32 })
    );
}

#[rstest]
#[case::inline(125, false, 2)]
#[case::short(126, false, 4)]
#[case::short_max(65_535, false, 4)]
#[case::long(65_536, false, 10)]
#[case::masked_inline(0, true, 6)]
#[case::masked_long(70_000, true, 14)]
fn header_length_by_payload(#[case] len: usize, #[case] masked: bool, #[case] expected: usize) {
    assert_eq!(header_len(len, masked), expected);
}

#[rstest]
#[case::inline(5, &[0x81, 0x05][..])]
#[case::short(256, &[0x81, 0x7e, 0x01, 0x00][..])]
#[case::long(65_536, &[0x81, 0x7f, 0, 0, 0, 0, 0, 1, 0, 0][..])]
fn header_is_written(#[case] len: usize, #[case] expected: &[u8]) {
    let mut buf = BytesMut::new();
    write_header(&mut buf, 0x81, len, None);
    assert_eq!(&buf[..], expected);
    assert_eq!(buf.len(), header_len(len, false));
}

#[test]
fn masked_header_carries_key() {
    let mut buf = BytesMut::new();
    write_header(&mut buf, 0x82, 3, Some([1, 2, 3, 4]));
    assert_eq!(&buf[..], &[0x82, 0x83, 1, 2, 3, 4]);
}

#[test]
fn masking_cycles_key_across_chunks() {
    let key = [0xff, 0x00, 0xff, 0x00];
    let mut data = [0u8; 7];
    apply_mask(&mut data, key);
    assert_eq!(data, [0xff, 0x00, 0xff, 0x00, 0xff, 0x00, 0xff]);
}

#[test]
fn mask_into_matches_in_place_masking() {
    let key = [0x37, 0xfa, 0x21, 0x3d];
    let src = b"a longer payload than four bytes";
    let mut copied = vec![0; src.len()];
    mask_into(&mut copied, src, key);
    let mut in_place = src.to_vec();
    apply_mask(&mut in_place, key);
    assert_eq!(copied, in_place);
}
