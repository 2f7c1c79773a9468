//! Frame codec
//!
//! Encoding and decoding functions for the 9-byte frame header, and
//! stream-based helpers that move whole frames.

use std::io::{Read, Write};

use bytes::Bytes;

use crate::error::{CoralError, Result};

/// Magic sentinel byte every frame starts with
pub const FRAME_MAGIC: u8 = 70;

/// Header size: 1 magic byte + 4 bytes proto length + 4 bytes value length
pub const HEADER_SIZE: usize = 9;

/// Maximum protocol-body size (4 MB); larger lengths mean a corrupt stream
pub const MAX_PROTO_SIZE: u32 = 4 * 1024 * 1024;

/// Maximum value size (16 MB); larger lengths mean a corrupt stream
pub const MAX_VALUE_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Frame Header
// =============================================================================

/// Decoded frame header: the lengths of the two regions that follow it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Length of the serialized envelope region
    pub proto_len: u32,

    /// Length of the raw value region (0 if absent)
    pub value_len: u32,
}

impl FrameHeader {
    pub fn new(proto_len: u32, value_len: u32) -> Self {
        Self {
            proto_len,
            value_len,
        }
    }

    /// Encode to the 9-byte wire form
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = FRAME_MAGIC;
        buf[1..5].copy_from_slice(&self.proto_len.to_be_bytes());
        buf[5..9].copy_from_slice(&self.value_len.to_be_bytes());
        buf
    }

    /// Decode from the bytes available at a frame boundary.
    ///
    /// - 0 bytes: the peer closed the connection ([`CoralError::Closed`])
    /// - fewer than 9 bytes: truncated mid-header ([`CoralError::InvalidStream`])
    /// - wrong magic: stream out of sync ([`CoralError::InvalidIdentifier`])
    pub fn decode(bytes: &[u8]) -> Result<FrameHeader> {
        match bytes.len() {
            HEADER_SIZE => {}
            0 => return Err(CoralError::Closed),
            _ => return Err(CoralError::InvalidStream),
        }

        if bytes[0] != FRAME_MAGIC {
            return Err(CoralError::InvalidIdentifier(bytes[0]));
        }

        let proto_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        let value_len = u32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);

        Ok(FrameHeader {
            proto_len,
            value_len,
        })
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read as many bytes as possible into `buf`, stopping at EOF.
///
/// Returns the number of bytes read. Unlike `read_exact`, a short count is
/// reported to the caller instead of surfacing as an untyped error.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CoralError::Io(e)),
        }
    }
    Ok(filled)
}

/// Read and decode a frame header from a stream
pub fn read_header<R: Read>(reader: &mut R) -> Result<FrameHeader> {
    let mut buf = [0u8; HEADER_SIZE];
    let n = read_full(reader, &mut buf)?;
    FrameHeader::decode(&buf[..n])
}

/// Read a complete frame: header, then exactly the two regions it announces.
///
/// EOF in the middle of either region is stream corruption and is reported,
/// never silently truncated.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<(Vec<u8>, Bytes)> {
    let header = read_header(reader)?;

    if header.proto_len > MAX_PROTO_SIZE {
        return Err(CoralError::Protocol(format!(
            "Frame body too large: {} bytes (max {})",
            header.proto_len, MAX_PROTO_SIZE
        )));
    }
    if header.value_len > MAX_VALUE_SIZE {
        return Err(CoralError::Protocol(format!(
            "Frame value too large: {} bytes (max {})",
            header.value_len, MAX_VALUE_SIZE
        )));
    }

    let mut proto = vec![0u8; header.proto_len as usize];
    if read_full(reader, &mut proto)? < proto.len() {
        return Err(CoralError::InvalidStream);
    }

    let value = if header.value_len > 0 {
        let mut value = vec![0u8; header.value_len as usize];
        if read_full(reader, &mut value)? < value.len() {
            return Err(CoralError::InvalidStream);
        }
        Bytes::from(value)
    } else {
        Bytes::new()
    };

    Ok((proto, value))
}

/// Write a complete frame: header, proto region, then the value region.
///
/// The caller must hold the writer exclusively; the regions of one frame are
/// flushed together so they are never interleaved with another frame's.
pub fn write_frame<W: Write>(writer: &mut W, proto: &[u8], value: &[u8]) -> Result<()> {
    let header = FrameHeader::new(proto.len() as u32, value.len() as u32);
    writer.write_all(&header.encode())?;
    writer.write_all(proto)?;
    if !value.is_empty() {
        writer.write_all(value)?;
    }
    writer.flush()?;
    Ok(())
}
