//! A VAPID signing key: an ECDSA P-256 private key whose public identity is
//! the Base64URL-unpadded X9.63 uncompressed point (the "Key ID").

use std::cmp::Ordering;
use std::fmt;

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use rand::rngs::OsRng;

use crate::base64url;
use crate::error::InvalidKey;

/// A Base64URL-unpadded X9.63 uncompressed public key, used as both the
/// `applicationServerKey` shown to browsers and the cache/lookup key for a
/// [`VapidKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyId(String);

impl KeyId {
    fn from_public_point(bytes: &[u8]) -> Self {
        KeyId(base64url::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for KeyId {
    /// Wraps an already Base64URL-encoded Key ID, as received from a
    /// subscription's `applicationServerKey`.
    fn from(value: String) -> Self {
        KeyId(value)
    }
}

impl From<&str> for KeyId {
    fn from(value: &str) -> Self {
        KeyId(value.to_string())
    }
}

impl PartialOrd for KeyId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// An ECDSA P-256 private key used to sign VAPID JWTs.
///
/// Two keys are equal iff their raw private scalars match, not by identity or
/// Key ID alone (though the two necessarily coincide for well-formed keys).
#[derive(Clone)]
pub struct VapidKey {
    secret: SecretKey,
}

impl fmt::Debug for VapidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidKey").field("key_id", &self.key_id()).finish()
    }
}

impl PartialEq for VapidKey {
    fn eq(&self, other: &Self) -> bool {
        self.secret.to_bytes() == other.secret.to_bytes()
    }
}

impl Eq for VapidKey {}

impl VapidKey {
    /// Generates a new random P-256 private key.
    pub fn generate() -> Self {
        let secret = SecretKey::random(&mut OsRng);
        VapidKey { secret }
    }

    /// Loads a key from the Base64URL-encoded raw private scalar.
    pub fn from_base64url(input: impl AsRef<[u8]>) -> Result<Self, InvalidKey> {
        let raw = base64url::decode(input)?;
        Self::from_raw_scalar(&raw)
    }

    /// Loads a key from the raw private scalar bytes.
    pub fn from_raw_scalar(raw: &[u8]) -> Result<Self, InvalidKey> {
        let secret = SecretKey::from_slice(raw).map_err(|_| InvalidKey::Curve)?;
        Ok(VapidKey { secret })
    }

    /// Serializes the raw private scalar, for persistence alongside the
    /// configuration file (see the crate's `VapidConfig` JSON shape).
    pub fn to_raw_scalar(&self) -> Vec<u8> {
        self.secret.to_bytes().to_vec()
    }

    /// Serializes the raw private scalar as Base64URL.
    pub fn to_base64url(&self) -> String {
        base64url::encode(self.to_raw_scalar())
    }

    /// The X9.63 uncompressed public key bytes (`0x04 || X || Y`, 65 bytes).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.secret
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// The subscriber-facing Key ID: Base64URL of the uncompressed public key.
    pub fn key_id(&self) -> KeyId {
        KeyId::from_public_point(&self.public_key_bytes())
    }

    /// ECDSA-over-SHA-256 signs `message`, producing a 64-byte `R||S` raw signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let signing_key = SigningKey::from(&self.secret);
        let signature: Signature = signing_key.sign(message);
        signature.to_bytes().into()
    }

    /// Verifies a 64-byte `R||S` signature against the public key named by `key_id`.
    pub fn verify(key_id: &KeyId, message: &[u8], signature: &[u8]) -> bool {
        let Ok(point) = base64url::decode(key_id.as_str()) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(&point) else {
            return false;
        };
        let Ok(sig) = Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify(message, &sig).is_ok()
    }
}
