//! Wire Codec Tests
//!
//! Tests for frame header encoding/decoding and whole-frame stream I/O.

use std::io::Cursor;

use coralkv::wire::{
    read_frame, read_header, write_frame, FrameHeader, FRAME_MAGIC, HEADER_SIZE, MAX_PROTO_SIZE,
};
use coralkv::CoralError;

// =============================================================================
// Header Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_header_round_trip() {
    for (proto_len, value_len) in [(0, 0), (1, 0), (0, 1), (512, 4096), (u32::MAX, u32::MAX)] {
        let header = FrameHeader::new(proto_len, value_len);
        let encoded = header.encode();
        let decoded = FrameHeader::decode(&encoded).unwrap();

        assert_eq!(decoded.proto_len, proto_len);
        assert_eq!(decoded.value_len, value_len);
    }
}

#[test]
fn test_header_wire_layout() {
    let header = FrameHeader::new(0x0102, 3);
    let encoded = header.encode();

    assert_eq!(encoded.len(), HEADER_SIZE);
    assert_eq!(encoded[0], FRAME_MAGIC);
    assert_eq!(&encoded[1..5], &[0x00, 0x00, 0x01, 0x02]); // proto len, big-endian
    assert_eq!(&encoded[5..9], &[0x00, 0x00, 0x00, 0x03]); // value len, big-endian
}

#[test]
fn test_header_zero_bytes_is_closed() {
    let result = FrameHeader::decode(&[]);
    assert!(matches!(result, Err(CoralError::Closed)));
}

#[test]
fn test_header_short_read_is_invalid_stream() {
    let result = FrameHeader::decode(&[FRAME_MAGIC, 0x00, 0x00]);
    assert!(matches!(result, Err(CoralError::InvalidStream)));
}

#[test]
fn test_header_bad_magic_is_invalid_identifier() {
    let mut bytes = FrameHeader::new(1, 1).encode();
    bytes[0] = 0xAA;

    let result = FrameHeader::decode(&bytes);
    assert!(matches!(result, Err(CoralError::InvalidIdentifier(0xAA))));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_frame_round_trip() {
    let proto = b"protocol body bytes";
    let value = b"value region";

    let mut buffer = Vec::new();
    write_frame(&mut buffer, proto, value).unwrap();

    let mut cursor = Cursor::new(buffer);
    let (read_proto, read_value) = read_frame(&mut cursor).unwrap();

    assert_eq!(read_proto, proto);
    assert_eq!(&read_value[..], value);
}

#[test]
fn test_frame_round_trip_no_value() {
    let proto = b"body only";

    let mut buffer = Vec::new();
    write_frame(&mut buffer, proto, &[]).unwrap();
    assert_eq!(buffer.len(), HEADER_SIZE + proto.len());

    let mut cursor = Cursor::new(buffer);
    let (read_proto, read_value) = read_frame(&mut cursor).unwrap();

    assert_eq!(read_proto, proto);
    assert!(read_value.is_empty());
}

#[test]
fn test_multiple_frames_in_sequence() {
    let frames: Vec<(&[u8], &[u8])> = vec![
        (b"first", b""),
        (b"second", b"with value"),
        (b"third", b"v"),
    ];

    let mut buffer = Vec::new();
    for (proto, value) in &frames {
        write_frame(&mut buffer, proto, value).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for (proto, value) in &frames {
        let (read_proto, read_value) = read_frame(&mut cursor).unwrap();
        assert_eq!(&read_proto[..], *proto);
        assert_eq!(&read_value[..], *value);
    }

    // Nothing left: the next read reports a clean close
    assert!(matches!(read_frame(&mut cursor), Err(CoralError::Closed)));
}

#[test]
fn test_read_header_at_eof_is_closed() {
    let mut cursor = Cursor::new(Vec::new());
    assert!(matches!(read_header(&mut cursor), Err(CoralError::Closed)));
}

#[test]
fn test_truncated_body_is_invalid_stream() {
    // Header promises 10 body bytes but only 4 follow
    let mut buffer = FrameHeader::new(10, 0).encode().to_vec();
    buffer.extend_from_slice(b"four");

    let mut cursor = Cursor::new(buffer);
    assert!(matches!(
        read_frame(&mut cursor),
        Err(CoralError::InvalidStream)
    ));
}

#[test]
fn test_truncated_value_is_invalid_stream() {
    let mut buffer = Vec::new();
    write_frame(&mut buffer, b"body", b"value").unwrap();
    buffer.truncate(buffer.len() - 2);

    let mut cursor = Cursor::new(buffer);
    assert!(matches!(
        read_frame(&mut cursor),
        Err(CoralError::InvalidStream)
    ));
}

#[test]
fn test_oversized_proto_length_rejected() {
    let buffer = FrameHeader::new(MAX_PROTO_SIZE + 1, 0).encode().to_vec();

    let mut cursor = Cursor::new(buffer);
    assert!(matches!(
        read_frame(&mut cursor),
        Err(CoralError::Protocol(_))
    ));
}
