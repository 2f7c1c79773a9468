//! Authentication Tests
//!
//! Tests for the HMAC credential and its signing behavior.

use coralkv::proto::{AuthType, Message};
use coralkv::{AuthenticationCredential, HmacCredential};

#[test]
fn test_digest_is_deterministic() {
    let credential = HmacCredential::new(1, "secret");
    let bytes = b"some command bytes";

    assert_eq!(credential.digest(bytes), credential.digest(bytes));
}

#[test]
fn test_digest_depends_on_key() {
    let a = HmacCredential::new(1, "secret-a");
    let b = HmacCredential::new(1, "secret-b");

    assert_ne!(a.digest(b"payload"), b.digest(b"payload"));
}

#[test]
fn test_digest_depends_on_payload() {
    let credential = HmacCredential::new(1, "secret");

    assert_ne!(credential.digest(b"payload one"), credential.digest(b"payload two"));
}

#[test]
fn test_digest_covers_length_prefix() {
    // The digest covers a 4-byte big-endian length before the bytes, so two
    // payloads that only differ in length still produce distinct digests even
    // when one is a prefix of the other
    let credential = HmacCredential::new(1, "secret");

    assert_ne!(credential.digest(b"abc"), credential.digest(b"abcabc"));
}

#[test]
fn test_digest_length_is_sha1() {
    let credential = HmacCredential::new(1, "secret");
    assert_eq!(credential.digest(b"x").len(), 20);
}

#[test]
fn test_authenticate_sets_envelope_fields() {
    let credential = HmacCredential::new(7, "secret");

    let mut message = Message::new();
    message.command_bytes = b"finalized command".to_vec();
    credential.authenticate(&mut message);

    assert_eq!(message.auth_type, AuthType::Hmac);
    let auth = message.hmac_auth.expect("auth fields attached");
    assert_eq!(auth.identity, 7);
    assert_eq!(auth.hmac, credential.digest(b"finalized command"));
}

#[test]
fn test_default_credentials() {
    let credential = HmacCredential::default_credentials();
    assert_eq!(credential.identity, 1);
    assert_eq!(credential.key, "asdfasdf");
}
