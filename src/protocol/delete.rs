//! Delete command
//!
//! Removes a key. Deleting an absent key succeeds with `existed` false.

use crate::proto::{Builder, MessageType};
use crate::session::Device;

use super::{ChannelCommand, EmptyResponse};

/// Remove one key
#[derive(Debug, Clone)]
pub struct DeleteCommand {
    pub key: Vec<u8>,
}

impl DeleteCommand {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }
}

impl ChannelCommand for DeleteCommand {
    type Context = ();
    type Response = EmptyResponse;

    fn build(&self, builder: &mut Builder, _device: &Device) {
        builder.header().message_type = MessageType::Delete;
        builder.key_value().key = self.key.clone();
    }
}
