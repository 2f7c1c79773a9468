//! Envelope Module
//!
//! Typed message and command structures exchanged with a device, plus the
//! serialization layer that turns them into bytes and back.
//!
//! ## Layout
//!
//! Every frame body is a [`Message`]: an authentication wrapper around the
//! serialized bytes of a [`Command`]. The command carries the routing header
//! (cluster version, connection id, sequence numbers, message type, batch id),
//! an operation-specific body, and on responses a status.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Message                                     │
//! │   auth_type + hmac_auth                     │
//! │   command_bytes ──► Command                 │
//! │                       header (routing)      │
//! │                       body   (operation)    │
//! │                       status (responses)    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Serialization uses bincode; the digest in `hmac_auth` is computed over
//! `command_bytes` exactly as they go on the wire.

mod builder;

pub use builder::Builder;

use serde::{Deserialize, Serialize};

use crate::error::{CoralError, Result};

// =============================================================================
// Message wrapper
// =============================================================================

/// Authentication scheme tag carried by a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthType {
    /// No credential attached (never valid on the wire)
    Invalid,

    /// Identity + keyed digest
    Hmac,

    /// Unsolicited device-originated message (handshake, async status)
    Unsolicited,
}

/// HMAC credential fields attached to an authenticated message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HmacAuth {
    /// Credential identity known to the device
    pub identity: i64,

    /// Keyed digest over the command bytes
    pub hmac: Vec<u8>,
}

/// Outer message wrapper: authentication envelope around command bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Which authentication scheme (if any) signed this message
    pub auth_type: AuthType,

    /// Present when `auth_type` is [`AuthType::Hmac`]
    pub hmac_auth: Option<HmacAuth>,

    /// Serialized [`Command`], signed as-is
    pub command_bytes: Vec<u8>,
}

impl Message {
    /// Create an unsigned message; authentication fills the rest before send
    pub fn new() -> Self {
        Self {
            auth_type: AuthType::Invalid,
            hmac_auth: None,
            command_bytes: Vec::new(),
        }
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Command structure
// =============================================================================

/// Operation discriminator carried in the command header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Get,
    GetResponse,
    Put,
    PutResponse,
    Delete,
    DeleteResponse,
    GetKeyRange,
    GetKeyRangeResponse,
    StartBatch,
    StartBatchResponse,
    EndBatch,
    EndBatchResponse,
    AbortBatch,
    AbortBatchResponse,
    GetLog,
    GetLogResponse,
    /// Device-originated message that answers no request (handshake)
    Unsolicited,
}

/// Routing and state fields shared by every command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Cluster version the sender believes the device is at
    pub cluster_version: i64,

    /// Connection id assigned by the device during handshake
    pub connection_id: i64,

    /// Client-assigned identifier of a request
    pub sequence: u64,

    /// On responses, the `sequence` this message replies to
    pub ack_sequence: u64,

    /// Operation discriminator
    pub message_type: MessageType,

    /// Set on batch sub-operations and batch control commands
    pub batch_id: Option<u32>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            cluster_version: 0,
            connection_id: 0,
            sequence: 0,
            ack_sequence: 0,
            message_type: MessageType::Unsolicited,
            batch_id: None,
        }
    }
}

/// Value integrity tag algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagAlgorithm {
    Crc32,
    Sha1,
}

/// Durability requested for a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Synchronization {
    /// Acknowledge once staged in the device write cache
    WriteBack,

    /// Acknowledge only after the write is persistent
    WriteThrough,
}

/// Key/value fields for get, put and delete operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: Vec<u8>,

    /// Integrity tag over the value bytes
    pub tag: Vec<u8>,

    pub algorithm: TagAlgorithm,

    pub synchronization: Synchronization,
}

impl Default for KeyValue {
    fn default() -> Self {
        Self {
            key: Vec::new(),
            tag: Vec::new(),
            algorithm: TagAlgorithm::Crc32,
            synchronization: Synchronization::WriteBack,
        }
    }
}

/// Bound and pagination fields for a key-range query.
///
/// Requests populate the bounds; responses carry the matched `keys`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RangeBody {
    pub start_key: Vec<u8>,
    pub start_inclusive: bool,
    pub end_key: Vec<u8>,
    pub end_inclusive: bool,
    pub reverse: bool,
    pub max_returned: u32,
    pub keys: Vec<Vec<u8>>,
}

/// Batch control fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchBody {
    /// On end-batch: number of sub-operations the client issued, so the
    /// device can detect operations lost in transit
    pub count: u32,
}

/// Device configuration reported in the handshake
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    pub world_wide_name: Vec<u8>,
    pub model: String,
    pub firmware_version: String,
}

/// Device limits reported in the handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsInfo {
    pub max_key_size: u32,
    pub max_value_size: u32,
    pub max_key_range_count: u32,
}

/// Device-report fields (handshake payload)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetLog {
    pub configuration: Option<Configuration>,
    pub limits: Option<LimitsInfo>,
}

/// Operation-specific body; unused sections stay `None`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Body {
    pub key_value: Option<KeyValue>,
    pub range: Option<RangeBody>,
    pub batch: Option<BatchBody>,
    pub get_log: Option<GetLog>,
}

/// Status codes a device may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    InvalidStatusCode,
    NotAttempted,
    Success,
    HmacFailure,
    NotAuthorized,
    VersionFailure,
    InternalError,
    HeaderRequired,
    NotFound,
    VersionMismatch,
    ServiceBusy,
    Expired,
    DataError,
    PermDataError,
    RemoteConnectionError,
    NoSpace,
    NoSuchHmacAlgorithm,
    InvalidRequest,
    NestedOperationErrors,
    DeviceLocked,
    DeviceAlreadyUnlocked,
    ConnectionTerminated,
    InvalidBatch,
}

impl StatusCode {
    /// Integer value of this status code
    pub fn code(self) -> i32 {
        match self {
            StatusCode::InvalidStatusCode => -1,
            StatusCode::NotAttempted => 0,
            StatusCode::Success => 1,
            StatusCode::HmacFailure => 2,
            StatusCode::NotAuthorized => 3,
            StatusCode::VersionFailure => 4,
            StatusCode::InternalError => 5,
            StatusCode::HeaderRequired => 6,
            StatusCode::NotFound => 7,
            StatusCode::VersionMismatch => 8,
            StatusCode::ServiceBusy => 9,
            StatusCode::Expired => 10,
            StatusCode::DataError => 11,
            StatusCode::PermDataError => 12,
            StatusCode::RemoteConnectionError => 13,
            StatusCode::NoSpace => 14,
            StatusCode::NoSuchHmacAlgorithm => 15,
            StatusCode::InvalidRequest => 16,
            StatusCode::NestedOperationErrors => 17,
            StatusCode::DeviceLocked => 18,
            StatusCode::DeviceAlreadyUnlocked => 19,
            StatusCode::ConnectionTerminated => 20,
            StatusCode::InvalidBatch => 21,
        }
    }
}

/// Status attached to a response command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
    pub detailed_message: Vec<u8>,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            code: StatusCode::NotAttempted,
            message: String::new(),
            detailed_message: Vec::new(),
        }
    }
}

impl Status {
    /// Success status with no message
    pub fn success() -> Self {
        Self {
            code: StatusCode::Success,
            message: String::new(),
            detailed_message: Vec::new(),
        }
    }
}

/// A complete command: routing header, operation body, response status
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Command {
    pub header: Header,
    pub body: Body,
    pub status: Status,
}

// =============================================================================
// Serialization layer
// =============================================================================

/// Encode a message wrapper to bytes
pub fn encode_message(message: &Message) -> Result<Vec<u8>> {
    bincode::serialize(message).map_err(|e| CoralError::Serialization(e.to_string()))
}

/// Decode a message wrapper from bytes
pub fn decode_message(bytes: &[u8]) -> Result<Message> {
    bincode::deserialize(bytes).map_err(|e| CoralError::Serialization(e.to_string()))
}

/// Encode a command to bytes (the bytes the credential signs)
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    bincode::serialize(command).map_err(|e| CoralError::Serialization(e.to_string()))
}

/// Decode a command from a message's `command_bytes`
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    bincode::deserialize(bytes).map_err(|e| CoralError::Serialization(e.to_string()))
}
