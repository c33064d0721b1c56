//! A Web Push application-server library: VAPID identity (RFC 8292),
//! message encryption (RFC 8291/8188), and a retrying delivery executor
//! (RFC 8030) behind a single [`manager::PushManager`].

pub mod base64url;
pub mod clock;
pub mod error;
pub mod http_ece;
pub mod manager;
pub mod message;
pub mod notification;
pub mod origin;
pub mod subscriber;
pub mod topic;
pub mod transport;
pub mod vapid;

pub use error::WebPushError;
pub use manager::{NetworkConfig, PushManager, SendOptions};
pub use message::{Urgency, WebPushMessage, WebPushMessageBuilder, WebPushPayload};
pub use notification::{Notification, NotificationAction, NotificationKind};
pub use subscriber::{Subscriber, UserAgentKeyMaterial};
pub use topic::Topic;
pub use vapid::{ContactInformation, KeyId, KeyStatus, VapidConfiguration, VapidKey, VapidSignature, VapidSignatureBuilder};
