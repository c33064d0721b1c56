//! Assembling a single push message: the encrypted payload plus the headers
//! a push service expects (§4.9-§4.10).

use std::fmt::{self, Display, Formatter};

use http::Uri;

use crate::clock::Clock;
use crate::error::WebPushError;
use crate::http_ece;
use crate::subscriber::Subscriber;
use crate::topic::Topic;

/// How important a message is to the user (RFC 8030 §5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Urgency {
    VeryLow,
    Low,
    #[default]
    Normal,
    High,
}

impl Display for Urgency {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Urgency::VeryLow => "very-low",
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::High => "high",
        };
        f.write_str(s)
    }
}

/// The encrypted push content payload and its content-coding label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebPushPayload {
    pub content: Vec<u8>,
    pub content_encoding: &'static str,
}

/// Everything needed to POST a notification to a push service.
#[derive(Debug, Clone)]
pub struct WebPushMessage {
    pub endpoint: Uri,
    pub ttl: u32,
    pub urgency: Urgency,
    pub topic: Option<Topic>,
    pub payload: Option<WebPushPayload>,
    pub authorization: String,
}

/// Builds a [`WebPushMessage`] from a subscriber, an already-minted VAPID
/// `Authorization` header, and optional plaintext to encrypt.
pub struct WebPushMessageBuilder<'a> {
    subscriber: &'a Subscriber,
    authorization: String,
    payload: Option<&'a [u8]>,
    ttl: u32,
    urgency: Urgency,
    topic: Option<Topic>,
}

impl<'a> WebPushMessageBuilder<'a> {
    pub fn new(subscriber: &'a Subscriber, authorization: impl Into<String>) -> Self {
        WebPushMessageBuilder {
            subscriber,
            authorization: authorization.into(),
            payload: None,
            ttl: 0,
            urgency: Urgency::default(),
            topic: None,
        }
    }

    pub fn set_ttl(&mut self, ttl: u32) -> &mut Self {
        self.ttl = ttl;
        self
    }

    pub fn set_urgency(&mut self, urgency: Urgency) -> &mut Self {
        self.urgency = urgency;
        self
    }

    pub fn set_topic(&mut self, topic: Topic) -> &mut Self {
        self.topic = Some(topic);
        self
    }

    pub fn set_payload(&mut self, content: &'a [u8]) -> &mut Self {
        self.payload = Some(content);
        self
    }

    pub fn build(self, clock: &dyn Clock) -> Result<WebPushMessage, WebPushError> {
        let payload = match self.payload {
            Some(content) => {
                let wire_body = http_ece::encrypt(
                    content,
                    self.subscriber.key_material().public_key(),
                    self.subscriber.key_material().auth_secret(),
                    clock,
                )?;
                Some(WebPushPayload {
                    content: wire_body,
                    content_encoding: "aes128gcm",
                })
            }
            None => None,
        };

        Ok(WebPushMessage {
            endpoint: self.subscriber.endpoint().clone(),
            ttl: self.ttl,
            urgency: self.urgency,
            topic: self.topic,
            payload,
            authorization: self.authorization,
        })
    }
}
