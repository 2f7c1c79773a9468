//! Envelope builder
//!
//! Mutable staging area a command populates before the session seals it:
//! commands set the message type and body fields, the session fills routing
//! and authentication, then the whole envelope is encoded for transmission.

use bytes::Bytes;

use super::{
    BatchBody, Body, Command, GetLog, Header, KeyValue, Message, RangeBody,
};

/// Builder for one outgoing envelope.
///
/// Body sections are created on first access, so a command only touches the
/// sections its operation uses.
#[derive(Debug, Default)]
pub struct Builder {
    /// Outer wrapper; auth fields are set by the credential at send time
    pub message: Message,

    /// Command under construction
    pub command: Command,

    /// Raw value blob sent after the protocol body (empty if none)
    pub value: Bytes,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routing header
    pub fn header(&mut self) -> &mut Header {
        &mut self.command.header
    }

    /// Operation body
    pub fn body(&mut self) -> &mut Body {
        &mut self.command.body
    }

    /// Key/value section, created on first access
    pub fn key_value(&mut self) -> &mut KeyValue {
        self.command.body.key_value.get_or_insert_with(KeyValue::default)
    }

    /// Range section, created on first access
    pub fn range(&mut self) -> &mut RangeBody {
        self.command.body.range.get_or_insert_with(RangeBody::default)
    }

    /// Batch section, created on first access
    pub fn batch(&mut self) -> &mut BatchBody {
        self.command.body.batch.get_or_insert_with(BatchBody::default)
    }

    /// Device-report section, created on first access
    pub fn get_log(&mut self) -> &mut GetLog {
        self.command.body.get_log.get_or_insert_with(GetLog::default)
    }

    /// Attach a raw value blob
    pub fn set_value(&mut self, value: impl Into<Bytes>) {
        self.value = value.into();
    }
}
