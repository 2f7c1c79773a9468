//! Wire Module
//!
//! Frame encoding and decoding for the device stream protocol.
//!
//! ## Frame Format
//!
//! ```text
//! ┌──────────┬──────────────┬──────────────┬───────────┬───────────┐
//! │ Magic(1) │ ProtoLen (4) │ ValueLen (4) │   Proto   │   Value   │
//! └──────────┴──────────────┴──────────────┴───────────┴───────────┘
//! ```
//!
//! - Magic: fixed sentinel byte (70); any other value means the stream is
//!   out of sync and the frame is rejected
//! - ProtoLen / ValueLen: big-endian u32 lengths of the two regions
//! - Value region is absent when ValueLen is 0

mod codec;

pub use codec::{
    read_frame, read_header, write_frame, FrameHeader, FRAME_MAGIC, HEADER_SIZE,
    MAX_PROTO_SIZE, MAX_VALUE_SIZE,
};
