//! VAPID (RFC 8292): signing keys, multi-key configuration, and JWT minting.

pub mod builder;
pub mod config;
pub mod key;
pub mod token;

pub use builder::{PartialVapidSignatureBuilder, VapidSignature, VapidSignatureBuilder};
pub use config::{ContactInformation, KeyStatus, VapidConfiguration, WebPushConfigParseError};
pub use key::{KeyId, VapidKey};
pub use token::VapidClaims;
