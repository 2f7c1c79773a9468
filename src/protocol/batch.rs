//! Batch transactions
//!
//! Client-side coordination of a server-side atomic multi-operation unit.
//!
//! ## Lifecycle
//!
//! ```text
//!            put / delete (no-reply)
//!               ┌────────┐
//!               ▼        │
//! begin() ──► Active ────┘
//!               │
//!       ┌───────┴────────┐
//!       ▼                ▼
//!   Committed         Aborted      (both terminal)
//! ```
//!
//! Sub-operations are fire-and-forget: the device acknowledges only the
//! commit or abort, and the commit carries the client's operation count so
//! the device can detect sub-operations lost in transit.

use bytes::Bytes;

use crate::error::{CoralError, Result};
use crate::proto::{Builder, MessageType, Synchronization, TagAlgorithm};
use crate::session::{Device, Session};

use super::{ChannelCommand, NoResponse, VoidResponse};

// =============================================================================
// Batch control commands
// =============================================================================

/// Open a new batch on the device
#[derive(Debug, Clone)]
pub struct StartBatchCommand {
    pub batch_id: u32,
}

impl ChannelCommand for StartBatchCommand {
    type Context = ();
    type Response = VoidResponse;

    fn build(&self, builder: &mut Builder, _device: &Device) {
        builder.header().message_type = MessageType::StartBatch;
        builder.header().batch_id = Some(self.batch_id);
    }
}

/// Commit a batch, carrying the count of sub-operations issued
#[derive(Debug, Clone)]
pub struct CommitBatchCommand {
    pub batch_id: u32,
    pub count: u32,
}

impl ChannelCommand for CommitBatchCommand {
    type Context = ();
    type Response = VoidResponse;

    fn build(&self, builder: &mut Builder, _device: &Device) {
        builder.header().message_type = MessageType::EndBatch;
        builder.header().batch_id = Some(self.batch_id);
        builder.batch().count = self.count;
    }
}

/// Abandon a batch; nothing in it is applied
#[derive(Debug, Clone)]
pub struct AbortBatchCommand {
    pub batch_id: u32,
}

impl ChannelCommand for AbortBatchCommand {
    type Context = ();
    type Response = VoidResponse;

    fn build(&self, builder: &mut Builder, _device: &Device) {
        builder.header().message_type = MessageType::AbortBatch;
        builder.header().batch_id = Some(self.batch_id);
    }
}

// =============================================================================
// Batch sub-operations (fire-and-forget)
// =============================================================================

/// Put inside a batch; acknowledged only via the batch commit
#[derive(Debug, Clone)]
pub struct BatchPutCommand {
    pub batch_id: u32,
    pub key: Vec<u8>,
    pub value: Bytes,
}

impl ChannelCommand for BatchPutCommand {
    type Context = ();
    type Response = NoResponse;

    const EXPECTS_REPLY: bool = false;

    fn build(&self, builder: &mut Builder, _device: &Device) {
        builder.header().message_type = MessageType::Put;
        builder.header().batch_id = Some(self.batch_id);
        let kv = builder.key_value();
        kv.key = self.key.clone();
        kv.tag = {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&self.value);
            hasher.finalize().to_be_bytes().to_vec()
        };
        kv.algorithm = TagAlgorithm::Crc32;
        kv.synchronization = Synchronization::WriteBack;
        builder.set_value(self.value.clone());
    }
}

/// Delete inside a batch; acknowledged only via the batch commit
#[derive(Debug, Clone)]
pub struct BatchDeleteCommand {
    pub batch_id: u32,
    pub key: Vec<u8>,
}

impl ChannelCommand for BatchDeleteCommand {
    type Context = ();
    type Response = NoResponse;

    const EXPECTS_REPLY: bool = false;

    fn build(&self, builder: &mut Builder, _device: &Device) {
        builder.header().message_type = MessageType::Delete;
        builder.header().batch_id = Some(self.batch_id);
        builder.key_value().key = self.key.clone();
    }
}

// =============================================================================
// Batch handle
// =============================================================================

/// Lifecycle state of a batch handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Active,
    Committed,
    Aborted,
}

/// Handle to an open batch on a session.
///
/// Created by [`Session::begin_batch`]. Once committed or aborted the handle
/// is spent: every further operation fails with
/// [`CoralError::BatchNotActive`].
pub struct Batch<'a> {
    session: &'a Session,
    id: u32,
    count: u32,
    state: BatchState,
}

impl<'a> Batch<'a> {
    pub(crate) fn new(session: &'a Session, id: u32) -> Self {
        Self {
            session,
            id,
            count: 0,
            state: BatchState::Active,
        }
    }

    /// Batch id, unique within the session's lifetime
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Number of sub-operations accepted so far
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == BatchState::Active
    }

    fn require_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CoralError::BatchNotActive)
        }
    }

    /// Stage a put inside the batch
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Bytes>) -> Result<()> {
        self.require_active()?;

        self.session.send_no_reply(BatchPutCommand {
            batch_id: self.id,
            key: key.into(),
            value: value.into(),
        })?;
        self.count += 1;
        Ok(())
    }

    /// Stage a delete inside the batch
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> Result<()> {
        self.require_active()?;

        self.session.send_no_reply(BatchDeleteCommand {
            batch_id: self.id,
            key: key.into(),
        })?;
        self.count += 1;
        Ok(())
    }

    /// Apply every staged operation atomically
    pub fn commit(&mut self) -> Result<()> {
        self.require_active()?;

        self.session.send(CommitBatchCommand {
            batch_id: self.id,
            count: self.count,
        })?;
        self.state = BatchState::Committed;
        Ok(())
    }

    /// Abandon the batch; nothing staged is applied
    pub fn abort(&mut self) -> Result<()> {
        self.require_active()?;

        self.session.send(AbortBatchCommand { batch_id: self.id })?;
        self.state = BatchState::Aborted;
        Ok(())
    }
}
