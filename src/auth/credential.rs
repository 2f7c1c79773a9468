//! Credential implementations
//!
//! The baseline scheme is an integer identity plus a shared secret; the
//! digest is HMAC-SHA1 over the 4-byte big-endian length of the command
//! bytes followed by the command bytes themselves.

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::proto::{AuthType, HmacAuth, Message};

type HmacSha1 = Hmac<Sha1>;

/// A credential scheme able to sign an outgoing message.
///
/// Implementations set the message's auth-type tag and whatever auth fields
/// their scheme uses. `command_bytes` must already hold the final serialized
/// command when this runs.
pub trait AuthenticationCredential: Send + Sync {
    fn authenticate(&self, message: &mut Message);
}

/// Identity + shared-secret credential
#[derive(Debug, Clone)]
pub struct HmacCredential {
    pub identity: i64,
    pub key: String,
}

impl HmacCredential {
    pub fn new(identity: i64, key: impl Into<String>) -> Self {
        Self {
            identity,
            key: key.into(),
        }
    }

    /// The identity/secret pair devices ship with
    pub fn default_credentials() -> Self {
        Self::new(1, "asdfasdf")
    }

    /// Keyed digest over `(BE u32 length of bytes) || bytes`.
    ///
    /// Deterministic: the same key and bytes always produce the same digest.
    pub fn digest(&self, bytes: &[u8]) -> Vec<u8> {
        // HMAC accepts keys of any length
        let mut mac = HmacSha1::new_from_slice(self.key.as_bytes())
            .expect("HMAC key of any length is accepted");
        mac.update(&(bytes.len() as u32).to_be_bytes());
        mac.update(bytes);
        mac.finalize().into_bytes().to_vec()
    }
}

impl AuthenticationCredential for HmacCredential {
    fn authenticate(&self, message: &mut Message) {
        message.auth_type = AuthType::Hmac;
        message.hmac_auth = Some(HmacAuth {
            identity: self.identity,
            hmac: self.digest(&message.command_bytes),
        });
    }
}
