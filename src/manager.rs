//! The Push Manager: the process-wide executor that ties VAPID signing,
//! the aes128gcm encryption pipeline, and the HTTP transport together into
//! a single `send`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use http::{Request, Response};
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::error::{PushServiceErrorBody, WebPushError};
use crate::message::{Urgency, WebPushMessage, WebPushMessageBuilder};
use crate::origin;
use crate::subscriber::Subscriber;
use crate::topic::Topic;
use crate::transport::{PushTransport, RequestTimeouts};
use crate::vapid::key::{KeyId, VapidKey};
use crate::vapid::token::{self, VapidClaims};
use crate::vapid::VapidConfiguration;

const MAX_PUSH_TTL: Duration = Duration::from_secs(30 * 24 * 3600);
const TOKEN_MAX_LIFETIME: Duration = Duration::from_secs(24 * 3600);
const RESPONSE_SNIPPET_LEN: usize = 256;

/// Retry intervals, timeouts, and topic behavior that govern how `send` talks
/// to the push service. Independent of the VAPID configuration so it can be
/// tuned or swapped without re-validating keys.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub retry_intervals: Vec<Duration>,
    pub always_resolve_topics: bool,
    /// Bounds only the TCP/TLS handshake.
    pub connect_timeout: Duration,
    /// Bounds writing the request and receiving response headers.
    pub send_timeout: Option<Duration>,
    /// Bounds reading the response body once headers arrive.
    pub confirmation_timeout: Option<Duration>,
    pub proxy: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            retry_intervals: vec![Duration::from_millis(500), Duration::from_secs(2), Duration::from_secs(10)],
            always_resolve_topics: false,
            connect_timeout: Duration::from_secs(10),
            send_timeout: None,
            confirmation_timeout: None,
            proxy: None,
        }
    }
}

/// The message-specific knobs of a single `send` call.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub urgency: Urgency,
    pub topic: Option<Topic>,
    /// Seconds until the push service may discard the message. `0` means
    /// "drop if undeliverable"; values at or above the 30-day recommended
    /// maximum are sent without a delivery deadline.
    pub ttl_seconds: i64,
}

struct CacheEntry {
    header: String,
    renewal: SystemTime,
}

/// Process-wide singleton by convention: owns the VAPID configuration, the
/// key-id lookup table, the authorization cache, network configuration, and
/// the HTTP transport handle.
pub struct PushManager {
    config: VapidConfiguration,
    key_lookup: HashMap<KeyId, VapidKey>,
    cache: Mutex<HashMap<(KeyId, String), CacheEntry>>,
    network: NetworkConfig,
    transport: Arc<dyn PushTransport>,
    clock: Arc<dyn Clock>,
}

impl PushManager {
    pub fn new(config: VapidConfiguration, network: NetworkConfig, transport: Arc<dyn PushTransport>) -> Self {
        Self::with_clock(config, network, transport, Arc::new(SystemClock))
    }

    pub fn with_clock(config: VapidConfiguration, network: NetworkConfig, transport: Arc<dyn PushTransport>, clock: Arc<dyn Clock>) -> Self {
        let mut key_lookup = HashMap::new();
        for key in config.all_keys() {
            key_lookup.entry(key.key_id()).or_insert_with(|| key.clone());
        }

        log::info!(
            "push manager started: {} active key(s), {} deprecated key(s), retry intervals {:?}",
            config.active_keys().len(),
            config.deprecated_keys().len(),
            network.retry_intervals,
        );

        PushManager {
            config,
            key_lookup,
            cache: Mutex::new(HashMap::new()),
            network,
            transport,
            clock,
        }
    }

    pub fn config(&self) -> &VapidConfiguration {
        &self.config
    }

    /// Returns a valid `Authorization: vapid ...` header for `(key_id, endpoint)`,
    /// minting and caching a fresh one if the cached entry has passed its
    /// renewal deadline (§4.8).
    async fn load_authorization(&self, endpoint: &http::Uri, key_id: &KeyId) -> Result<String, WebPushError> {
        let key = self.key_lookup.get(key_id).ok_or(WebPushError::MatchingKeyNotFound)?;

        let origin = origin::origin(endpoint);
        let cache_key = (key_id.clone(), origin.clone());

        let now = self.clock.now();
        let expiry = now + std::cmp::min(self.config.expiration(), TOKEN_MAX_LIFETIME);
        let renewal = std::cmp::min(now + self.config.validity(), expiry);

        let mut cache = self.cache.lock().await;
        if let Some(entry) = cache.get(&cache_key) {
            if now < entry.renewal {
                return Ok(entry.header.clone());
            }
        }

        log::debug!("minting new VAPID token for key {key_id} at origin {origin}");

        let exp = expiry.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
        let claims = VapidClaims {
            aud: origin,
            sub: self.config.contact_information().as_sub_claim(),
            exp,
        };
        let jwt = token::generate(key, &claims);
        let header = token::authorization_header(&jwt, key_id);

        cache.insert(
            cache_key,
            CacheEntry {
                header: header.clone(),
                renewal,
            },
        );

        Ok(header)
    }

    /// Encrypts `payload` (if any), signs a VAPID header, and delivers the
    /// message to the subscriber's endpoint, retrying transient failures per
    /// `NetworkConfig::retry_intervals` (§4.9-§4.11).
    pub async fn send(&self, subscriber: &Subscriber, payload: Option<&[u8]>, options: SendOptions) -> Result<(), WebPushError> {
        if self.config.key_status(subscriber.vapid_key_id()) == crate::vapid::KeyStatus::Unknown {
            log::warn!("send to {} references an unknown VAPID key id", subscriber.log_identity());
        }

        let ttl = clamp_ttl(options.ttl_seconds);
        let start = self.clock.now();
        let deadline = if ttl > Duration::ZERO && ttl < MAX_PUSH_TTL { Some(start + ttl) } else { None };

        let topic = match options.topic {
            Some(topic) => Some(topic),
            None if self.network.always_resolve_topics => Some(Topic::random(self.clock.as_ref())),
            None => None,
        };

        let authorization = self.load_authorization(subscriber.endpoint(), subscriber.vapid_key_id()).await?;

        let mut builder = WebPushMessageBuilder::new(subscriber, authorization);
        builder.set_ttl(ttl.as_secs() as u32).set_urgency(options.urgency);
        if let Some(ref topic) = topic {
            builder.set_topic(topic.clone());
        }
        if let Some(content) = payload {
            builder.set_payload(content);
        }
        let message = builder.build(self.clock.as_ref())?;

        let mut remaining_intervals: &[Duration] = &self.network.retry_intervals;

        loop {
            let per_attempt_deadline = match deadline {
                Some(deadline) => {
                    let now = self.clock.now();
                    if now >= deadline {
                        return Err(WebPushError::DeadlineExceeded(Duration::ZERO));
                    }
                    Some(deadline.duration_since(now).unwrap_or_default())
                }
                None => None,
            };

            log::trace!(
                "push attempt: endpoint={} topic={:?} ttl={} urgency={} retries-remaining={}",
                origin::origin(subscriber.endpoint()),
                topic.as_ref().map(Topic::as_str),
                message.ttl,
                message.urgency,
                remaining_intervals.len(),
            );

            let request = build_request(&message)?;
            let timeouts = RequestTimeouts {
                deadline: per_attempt_deadline,
                send_timeout: self.network.send_timeout,
                confirmation_timeout: self.network.confirmation_timeout,
            };
            let response = self.transport.execute(request, timeouts).await?;

            match classify(&response) {
                Disposition::Success => return Ok(()),
                Disposition::BadSubscriber => return Err(WebPushError::BadSubscriber),
                Disposition::MessageTooLarge => return Err(WebPushError::MessageTooLarge),
                Disposition::Retryable => {
                    if let [next, rest @ ..] = remaining_intervals {
                        self.clock.sleep(*next).await;
                        remaining_intervals = rest;
                        continue;
                    }
                    return Err(WebPushError::PushServiceError(error_body(&response)));
                }
                Disposition::Other => return Err(WebPushError::PushServiceError(error_body(&response))),
            }
        }
    }

    /// Stops accepting new work, lets in-flight sends finish, and closes the
    /// transport's connection pool.
    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}

fn clamp_ttl(ttl_seconds: i64) -> Duration {
    if ttl_seconds < 0 {
        log::error!("negative TTL {ttl_seconds} clamped to 0");
        return Duration::ZERO;
    }
    if ttl_seconds as u64 > MAX_PUSH_TTL.as_secs() {
        log::warn!("TTL {ttl_seconds}s exceeds the 30-day recommended maximum; sending unchanged");
    }
    Duration::from_secs(ttl_seconds as u64)
}

fn build_request(message: &WebPushMessage) -> Result<Request<Vec<u8>>, WebPushError> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(message.endpoint.clone())
        .header("Authorization", &message.authorization)
        .header("TTL", message.ttl.to_string())
        .header("Urgency", message.urgency.to_string());

    if let Some(ref topic) = message.topic {
        builder = builder.header("Topic", topic.as_str());
    }

    let body = match message.payload {
        Some(ref payload) => {
            builder = builder
                .header("Content-Encoding", payload.content_encoding)
                .header("Content-Type", "application/octet-stream");
            payload.content.clone()
        }
        None => Vec::new(),
    };

    builder.body(body).map_err(|_| WebPushError::InvalidUri)
}

enum Disposition {
    Success,
    BadSubscriber,
    MessageTooLarge,
    Retryable,
    Other,
}

fn classify(response: &Response<Vec<u8>>) -> Disposition {
    match response.status().as_u16() {
        201 => Disposition::Success,
        404 | 410 => Disposition::BadSubscriber,
        413 => Disposition::MessageTooLarge,
        429 | 500 | 503 => Disposition::Retryable,
        _ => Disposition::Other,
    }
}

fn error_body(response: &Response<Vec<u8>>) -> PushServiceErrorBody {
    let snippet: String = String::from_utf8_lossy(response.body()).chars().take(RESPONSE_SNIPPET_LEN).collect();
    PushServiceErrorBody {
        status: response.status().as_u16(),
        snippet,
    }
}
