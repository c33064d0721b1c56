//! A subscriber: a browser's push-service endpoint plus the user-agent key
//! material supplied when it registered for push.

use http::Uri;
use p256::PublicKey;

use crate::base64url;
use crate::error::{UserAgentKeyMaterialError, WebPushError};
use crate::vapid::KeyId;

/// The browser's P-256 public key (`p256dh`) and 16-byte authentication
/// secret (`auth`), generated at subscription time.
#[derive(Debug, Clone)]
pub struct UserAgentKeyMaterial {
    public_key: PublicKey,
    public_key_bytes: Vec<u8>,
    auth_secret: [u8; 16],
}

impl UserAgentKeyMaterial {
    pub fn new(p256dh: &str, auth: &str) -> Result<Self, UserAgentKeyMaterialError> {
        let public_key_bytes =
            base64url::decode(p256dh).map_err(|e| UserAgentKeyMaterialError::InvalidPublicKey { cause: e.to_string() })?;

        let public_key = PublicKey::from_sec1_bytes(&public_key_bytes)
            .map_err(|e| UserAgentKeyMaterialError::InvalidPublicKey { cause: e.to_string() })?;

        let auth_bytes =
            base64url::decode(auth).map_err(|e| UserAgentKeyMaterialError::InvalidAuthenticationSecret { cause: e.to_string() })?;

        let auth_secret: [u8; 16] = auth_bytes.try_into().map_err(|bytes: Vec<u8>| {
            UserAgentKeyMaterialError::InvalidAuthenticationSecret {
                cause: format!("expected 16 bytes, got {}", bytes.len()),
            }
        })?;

        Ok(UserAgentKeyMaterial {
            public_key,
            public_key_bytes,
            auth_secret,
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key_bytes
    }

    pub fn auth_secret(&self) -> &[u8; 16] {
        &self.auth_secret
    }
}

/// Endpoint URL + user-agent key material + the VAPID Key ID this subscriber
/// was registered under.
#[derive(Debug, Clone)]
pub struct Subscriber {
    endpoint: Uri,
    key_material: UserAgentKeyMaterial,
    vapid_key_id: KeyId,
}

impl Subscriber {
    pub fn new(endpoint: &str, p256dh: &str, auth: &str, vapid_key_id: impl Into<KeyId>) -> Result<Self, WebPushError> {
        let endpoint: Uri = endpoint.parse().map_err(|_| WebPushError::InvalidUri)?;
        let key_material = UserAgentKeyMaterial::new(p256dh, auth)?;

        Ok(Subscriber {
            endpoint,
            key_material,
            vapid_key_id: vapid_key_id.into(),
        })
    }

    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    pub fn key_material(&self) -> &UserAgentKeyMaterial {
        &self.key_material
    }

    pub fn vapid_key_id(&self) -> &KeyId {
        &self.vapid_key_id
    }

    /// A stable, PII-free identity for logging. Raw key material is never
    /// logged.
    pub fn log_identity(&self) -> String {
        self.endpoint.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (&'static str, &'static str) {
        (
            "BLMbF9ffKBiWQLCKvTHb6LO8Nb6dcUh6TItC455vu2kElga6PQvUmaFyCdykxY2nOSSL3yKgfbmFLRTUaGv4yV8",
            "xS03Fi5ErfTNH_l9WHE9Ig",
        )
    }

    #[test]
    fn valid_subscriber_parses() {
        let (p256dh, auth) = sample();
        let subscriber = Subscriber::new("https://push.example.net/abc", p256dh, auth, "key-id").unwrap();
        assert_eq!(subscriber.key_material().auth_secret().len(), 16);
    }

    #[test]
    fn invalid_public_key_is_rejected() {
        let err = UserAgentKeyMaterial::new("not-a-valid-key", "xS03Fi5ErfTNH_l9WHE9Ig").unwrap_err();
        assert!(matches!(err, UserAgentKeyMaterialError::InvalidPublicKey { .. }));
    }

    #[test]
    fn invalid_auth_secret_length_is_rejected() {
        let (p256dh, _) = sample();
        let err = UserAgentKeyMaterial::new(p256dh, "dG9vc2hvcnQ").unwrap_err();
        assert!(matches!(err, UserAgentKeyMaterialError::InvalidAuthenticationSecret { .. }));
    }
}
