//! Protocol Module
//!
//! The uniform shape every operation follows: a command builds its envelope
//! fields from typed arguments, and a paired response type parses the raw
//! reply using whatever context the build step produced.
//!
//! ## Command/response pairing
//!
//! Pairing is checked at compile time through associated types: each
//! [`ChannelCommand`] names its `Response`, and both agree on the `Context`
//! value that crosses from build to parse (range pagination is the one
//! operation that actually needs it).
//!
//! ## Status families
//!
//! - `Success` parses into the operation's success value
//! - `NotFound` is a successful-but-absent result for reads and deletes
//! - every other status becomes a [`RemoteError`] carried in the result

mod batch;
mod delete;
mod get;
mod put;
mod range;

pub use batch::{
    AbortBatchCommand, Batch, BatchDeleteCommand, BatchPutCommand, BatchState,
    CommitBatchCommand, StartBatchCommand,
};
pub use delete::DeleteCommand;
pub use get::GetCommand;
pub use put::PutCommand;
pub use range::{GetKeyRangeCommand, KeyIter, KeyRangeContext, KeyRangeResponse, Range};

use bytes::Bytes;

use crate::error::RemoteError;
use crate::proto::{Builder, Command, Message, StatusCode};
use crate::session::Device;

// =============================================================================
// Raw response
// =============================================================================

/// A decoded inbound frame before operation-specific parsing
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Outer message wrapper as received
    pub message: Message,

    /// Decoded command (header, body, status)
    pub command: Command,

    /// Raw value region of the frame (empty if none)
    pub value: Bytes,
}

impl RawResponse {
    /// Sequence number this response acknowledges
    pub fn ack_sequence(&self) -> u64 {
        self.command.header.ack_sequence
    }
}

// =============================================================================
// Command / response traits
// =============================================================================

/// An operation that can be sent over a session.
///
/// `build` mutates the envelope builder (message type, body fields, optional
/// value) from the operation's typed arguments and the device descriptor, and
/// returns the context its response parser consumes.
pub trait ChannelCommand {
    /// Build-time state carried to the response parser
    type Context;

    /// Typed response paired with this command
    type Response: ChannelResponse<Context = Self::Context>;

    /// Whether the device acknowledges this command individually.
    ///
    /// Batch sub-operations are fire-and-forget: they are successful once the
    /// local write completes, and only the batch commit/abort is acknowledged.
    const EXPECTS_REPLY: bool = true;

    fn build(&self, builder: &mut Builder, device: &Device) -> Self::Context;
}

/// Typed result of an operation.
///
/// `parse` maps the status code to the operation's outcome; non-success
/// statuses other than the documented absent-result cases become a
/// [`RemoteError`].
pub trait ChannelResponse: Sized {
    type Context;

    fn parse(raw: RawResponse, context: Self::Context) -> Result<Self, RemoteError>;
}

// =============================================================================
// Common responses
// =============================================================================

/// Response for writes: success, with `existed` false when the device
/// reported the key absent (delete of a missing key)
#[derive(Debug, Clone)]
pub struct EmptyResponse {
    /// Whether the key existed on the device
    pub existed: bool,
}

impl ChannelResponse for EmptyResponse {
    type Context = ();

    fn parse(raw: RawResponse, _context: ()) -> Result<Self, RemoteError> {
        match raw.command.status.code {
            StatusCode::Success => Ok(EmptyResponse { existed: true }),
            StatusCode::NotFound => Ok(EmptyResponse { existed: false }),
            _ => Err(RemoteError::from(&raw.command.status)),
        }
    }
}

/// Response for reads: `value` is `Some` when the key exists
#[derive(Debug, Clone)]
pub struct ValueResponse {
    /// The stored value, or `None` when the key is absent
    pub value: Option<Bytes>,
}

impl ValueResponse {
    /// Whether the key existed on the device
    pub fn exists(&self) -> bool {
        self.value.is_some()
    }
}

impl ChannelResponse for ValueResponse {
    type Context = ();

    fn parse(raw: RawResponse, _context: ()) -> Result<Self, RemoteError> {
        match raw.command.status.code {
            StatusCode::Success => Ok(ValueResponse {
                value: Some(raw.value),
            }),
            StatusCode::NotFound => Ok(ValueResponse { value: None }),
            _ => Err(RemoteError::from(&raw.command.status)),
        }
    }
}

/// Response carrying no payload: success or remote error
#[derive(Debug, Clone)]
pub struct VoidResponse;

impl ChannelResponse for VoidResponse {
    type Context = ();

    fn parse(raw: RawResponse, _context: ()) -> Result<Self, RemoteError> {
        match RemoteError::from_status(&raw.command.status) {
            None => Ok(VoidResponse),
            Some(err) => Err(err),
        }
    }
}

/// Response for fire-and-forget commands: never parsed from the wire
#[derive(Debug, Clone)]
pub struct NoResponse;

impl ChannelResponse for NoResponse {
    type Context = ();

    fn parse(_raw: RawResponse, _context: ()) -> Result<Self, RemoteError> {
        // The device sends no per-op acknowledgment for these
        Ok(NoResponse)
    }
}
