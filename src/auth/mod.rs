//! Authentication Module
//!
//! Attaches a verifiable credential to an outgoing message before send.
//!
//! The credential signs the command bytes exactly as they go on the wire, so
//! it runs after the command body is finalized and serialized. Verification
//! of inbound digests is performed by the device, not the client.

mod credential;

pub use credential::{AuthenticationCredential, HmacCredential};
