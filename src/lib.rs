//! # coralkv
//!
//! Client engine for the Coral binary key-value device protocol, with:
//! - Framed wire codec over a persistent TCP stream
//! - Authenticated command envelopes (HMAC identity credentials)
//! - Concurrent request/response multiplexing on one connection
//! - Atomic batch transactions
//! - Lazy, paginated range queries
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Application                              │
//! │        put / get / delete / batch / traverse                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ typed commands
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Session                                 │
//! │   sequence numbers │ pending table │ single-writer mutex     │
//! │             background reader thread                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ authenticated envelopes
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │               Wire Codec (framing)                           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ frames
//!                       ▼
//!                  Remote Device
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use coralkv::Session;
//!
//! # fn main() -> coralkv::Result<()> {
//! let session = Session::connect("localhost", 8123)?;
//! session.put("hello", "world")?;
//! let response = session.get("hello")?;
//! assert_eq!(response.value.as_deref(), Some(b"world".as_ref()));
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wire;
pub mod proto;
pub mod auth;
pub mod protocol;
pub mod session;
pub mod discovery;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CoralError, RemoteError, Result};
pub use config::{Config, DEFAULT_PORT};

pub use auth::{AuthenticationCredential, HmacCredential};
pub use protocol::{
    Batch, BatchState, ChannelCommand, ChannelResponse, DeleteCommand, EmptyResponse, GetCommand,
    GetKeyRangeCommand, KeyIter, KeyRangeResponse, PutCommand, Range, RawResponse, ValueResponse,
};
pub use session::{Device, Limits, Session};

/// Connect to a device with default credentials and configuration
pub fn connect(host: &str, port: u16) -> Result<Session> {
    Session::connect(host, port)
}

// =============================================================================
// Version Info
// =============================================================================

/// Current version of coralkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
