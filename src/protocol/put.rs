//! Put command
//!
//! Stores a value under a key. The value travels in the frame's raw value
//! region; the protocol body carries an integrity tag over it (CRC32) so the
//! device can verify the blob it received.

use bytes::Bytes;

use crate::proto::{Builder, MessageType, Synchronization, TagAlgorithm};
use crate::session::Device;

use super::{ChannelCommand, EmptyResponse};

/// Write one key/value pair
#[derive(Debug, Clone)]
pub struct PutCommand {
    pub key: Vec<u8>,
    pub value: Bytes,
    pub synchronization: Synchronization,
}

impl PutCommand {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            synchronization: Synchronization::WriteBack,
        }
    }

    /// Request a specific durability mode instead of the write-back default
    pub fn with_synchronization(mut self, synchronization: Synchronization) -> Self {
        self.synchronization = synchronization;
        self
    }

    /// CRC32 integrity tag over the value bytes
    fn tag(&self) -> Vec<u8> {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.value);
        hasher.finalize().to_be_bytes().to_vec()
    }
}

impl ChannelCommand for PutCommand {
    type Context = ();
    type Response = EmptyResponse;

    fn build(&self, builder: &mut Builder, _device: &Device) {
        builder.header().message_type = MessageType::Put;
        let kv = builder.key_value();
        kv.key = self.key.clone();
        kv.tag = self.tag();
        kv.algorithm = TagAlgorithm::Crc32;
        kv.synchronization = self.synchronization;
        builder.set_value(self.value.clone());
    }
}
