//! Topics: opaque identifiers push services use to dedupe queued messages.

use hkdf::Hkdf;
use serde::Serialize;
use sha2::Sha256;

use crate::base64url;
use crate::clock::Clock;

const TOPIC_INFO: &[u8] = b"WebPush Topic";
const TOPIC_LEN: usize = 24;

/// A push Topic: either derived deterministically from caller data, chosen
/// at random, or supplied verbatim by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic(String);

impl Topic {
    /// Derives a topic by HKDF-SHA256'ing the sorted-key JSON encoding of
    /// `value` under `salt`, truncated to 24 bytes and Base64URL-encoded to
    /// exactly 32 characters.
    pub fn derive<T: Serialize>(value: &T, salt: &[u8]) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(value)?;
        let ikm = serde_json::to_vec(&value)?;

        let hk = Hkdf::<Sha256>::new(Some(salt), &ikm);
        let mut okm = [0u8; TOPIC_LEN];
        hk.expand(TOPIC_INFO, &mut okm)
            .expect("24 bytes is within HKDF-SHA256's output limit");

        Ok(Topic(base64url::encode(okm)))
    }

    /// A topic made of 24 bytes of uniform randomness drawn from `clock`.
    pub fn random(clock: &dyn Clock) -> Self {
        Topic(base64url::encode(clock.random_bytes(TOPIC_LEN)))
    }

    /// Wraps a caller-supplied string verbatim, without validation. The push
    /// service may reject non-conforming topics with `400`.
    pub fn from_raw(value: impl Into<String>) -> Self {
        Topic(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_topics_are_deterministic() {
        let salt = b"some-salt-bytes.";
        let a = Topic::derive(&"subscriber-42", salt).unwrap();
        let b = Topic::derive(&"subscriber-42", salt).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn varying_value_or_salt_changes_the_topic() {
        let salt = b"some-salt-bytes.";
        let a = Topic::derive(&"subscriber-42", salt).unwrap();
        let b = Topic::derive(&"subscriber-43", salt).unwrap();
        let c = Topic::derive(&"subscriber-42", b"different-salt..").unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn derived_topics_are_base64url_safe() {
        let topic = Topic::derive(&"x", b"salt").unwrap();
        assert!(topic.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn random_topics_are_32_chars() {
        let topic = Topic::random(&crate::clock::SystemClock);
        assert_eq!(topic.as_str().len(), 32);
    }

    #[test]
    fn raw_topics_are_stored_verbatim() {
        let topic = Topic::from_raw("not-even-base64!");
        assert_eq!(topic.as_str(), "not-even-base64!");
    }
}
