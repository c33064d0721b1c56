use std::time::Duration;

use thiserror::Error;

/// Error decoding or encoding unpadded Base64URL.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid base64url input")]
pub struct InvalidBase64Url;

/// A VAPID key failed to load.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidKey {
    #[error("key is not valid base64url")]
    Encoding(#[from] InvalidBase64Url),
    #[error("key bytes do not form a valid P-256 private key")]
    Curve,
}

/// Errors raised when constructing or mutating a [`crate::vapid::VapidConfiguration`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no active VAPID keys were provided")]
    KeysNotProvided,
    #[error("contact information must be an http(s) URL or a mailto: address")]
    InvalidContactInformation,
}

/// Errors raised when parsing user-agent key material out of a subscription.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserAgentKeyMaterialError {
    #[error("invalid subscriber public key: {cause}")]
    InvalidPublicKey { cause: String },
    #[error("invalid subscriber authentication secret: {cause}")]
    InvalidAuthenticationSecret { cause: String },
}

/// A push-service error response, truncated to a short, loggable snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushServiceErrorBody {
    pub status: u16,
    pub snippet: String,
}

/// The sum type returned by [`crate::manager::PushManager::send`].
#[derive(Debug, Error)]
pub enum WebPushError {
    /// The subscription is no longer valid and should be discarded by the caller.
    #[error("subscriber is no longer valid and should be removed")]
    BadSubscriber,

    /// The encrypted body is too large for the push service to accept.
    #[error("message exceeds the maximum accepted push payload size")]
    MessageTooLarge,

    /// The subscriber's VAPID Key ID does not match any configured key.
    #[error("no VAPID key matches the subscriber's key id")]
    MatchingKeyNotFound,

    /// Raised only at VAPID configuration construction time.
    #[error("VAPID configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Raised only when parsing subscriber key material at ingest time.
    #[error("subscriber key material error: {0}")]
    UserAgentKeyMaterial(#[from] UserAgentKeyMaterialError),

    /// A non-2xx response not covered by a more specific variant, or exhausted retries.
    #[error("push service responded with status {} ({})", .0.status, .0.snippet)]
    PushServiceError(PushServiceErrorBody),

    /// Raised by key/topic Base64URL parsing.
    #[error("invalid base64url input")]
    InvalidBase64Url(#[from] InvalidBase64Url),

    /// The VAPID key bytes could not be loaded.
    #[error("invalid VAPID key: {0}")]
    InvalidKey(#[from] InvalidKey),

    /// The endpoint URL could not be parsed.
    #[error("invalid endpoint URL")]
    InvalidUri,

    /// The send deadline (derived from the caller's expiration) passed before the
    /// request could be sent or retried.
    #[error("send deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// Cancellation at a suspension point; no retry is attempted.
    #[error("send was cancelled")]
    Cancelled,

    /// Error from the underlying HTTP transport (connect failure, I/O, etc).
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body exceeded the size the client is willing to buffer.
    #[error("push service response body was too large")]
    ResponseTooLarge,
}

impl PartialEq for WebPushError {
    fn eq(&self, other: &Self) -> bool {
        use WebPushError::*;
        match (self, other) {
            (BadSubscriber, BadSubscriber) => true,
            (MessageTooLarge, MessageTooLarge) => true,
            (MatchingKeyNotFound, MatchingKeyNotFound) => true,
            (Configuration(a), Configuration(b)) => a == b,
            (UserAgentKeyMaterial(a), UserAgentKeyMaterial(b)) => a == b,
            (PushServiceError(a), PushServiceError(b)) => a == b,
            (InvalidBase64Url(a), InvalidBase64Url(b)) => a == b,
            (InvalidKey(a), InvalidKey(b)) => a == b,
            (InvalidUri, InvalidUri) => true,
            (DeadlineExceeded(a), DeadlineExceeded(b)) => a == b,
            (Cancelled, Cancelled) => true,
            (Transport(a), Transport(b)) => a == b,
            (ResponseTooLarge, ResponseTooLarge) => true,
            _ => false,
        }
    }
}
