//! Get command
//!
//! Reads the value stored under a key. An absent key is a successful result
//! with no value, not an error.

use crate::proto::{Builder, MessageType};
use crate::session::Device;

use super::{ChannelCommand, ValueResponse};

/// Read one key
#[derive(Debug, Clone)]
pub struct GetCommand {
    pub key: Vec<u8>,
}

impl GetCommand {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }
}

impl ChannelCommand for GetCommand {
    type Context = ();
    type Response = ValueResponse;

    fn build(&self, builder: &mut Builder, _device: &Device) {
        builder.header().message_type = MessageType::Get;
        builder.key_value().key = self.key.clone();
    }
}
