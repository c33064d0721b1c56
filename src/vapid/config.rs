//! VAPID configuration: the set of signing keys and contact information an
//! application server presents to push services, loaded once at startup.

use std::time::Duration;

use rand::seq::SliceRandom;
use serde_derive::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::vapid::key::{KeyId, VapidKey};

const DEFAULT_EXPIRATION: Duration = Duration::from_secs(22 * 3600);
const DEFAULT_VALIDITY: Duration = Duration::from_secs(20 * 3600);
const PUSH_SERVICE_MAX_EXPIRATION: Duration = Duration::from_secs(24 * 3600);

/// Contact information carried as the JWT `sub` claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactInformation {
    Email(String),
    Url(String),
}

impl ContactInformation {
    pub fn email(address: impl Into<String>) -> Result<Self, ConfigurationError> {
        let address = address.into();
        if address.is_empty() {
            return Err(ConfigurationError::InvalidContactInformation);
        }
        Ok(ContactInformation::Email(address))
    }

    pub fn url(url: impl Into<String>) -> Result<Self, ConfigurationError> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigurationError::InvalidContactInformation);
        }
        Ok(ContactInformation::Url(url))
    }

    /// Renders as the string used in the JWT `sub` claim.
    pub fn as_sub_claim(&self) -> String {
        match self {
            ContactInformation::Email(addr) => format!("mailto:{addr}"),
            ContactInformation::Url(url) => url.clone(),
        }
    }

    fn parse(value: &str) -> Result<Self, ConfigurationError> {
        if let Some(addr) = value.strip_prefix("mailto:") {
            Self::email(addr)
        } else if value.starts_with("http://") || value.starts_with("https://") {
            Self::url(value)
        } else {
            Err(ConfigurationError::InvalidContactInformation)
        }
    }
}

/// Disposition of a Key ID relative to a [`VapidConfiguration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Valid,
    Deprecated,
    Unknown,
}

/// Primary/active/deprecated VAPID keys, contact info, and token lifetimes.
#[derive(Debug, Clone)]
pub struct VapidConfiguration {
    primary: Option<VapidKey>,
    active: Vec<VapidKey>,
    deprecated: Vec<VapidKey>,
    contact: ContactInformation,
    expiration: Duration,
    validity: Duration,
}

impl VapidConfiguration {
    /// Validates and constructs a configuration. `active` need not already
    /// contain `primary`; it is folded in. Keys also present in `deprecated`
    /// are removed from `deprecated` to preserve the active/deprecated
    /// disjointness invariant.
    pub fn new(
        primary: Option<VapidKey>,
        mut active: Vec<VapidKey>,
        mut deprecated: Vec<VapidKey>,
        contact: ContactInformation,
        expiration: Duration,
        validity: Duration,
    ) -> Result<Self, ConfigurationError> {
        if let Some(ref primary_key) = primary {
            if !active.contains(primary_key) {
                active.push(primary_key.clone());
            }
        }
        dedup_by_key_id(&mut active);
        deprecated.retain(|k| !active.contains(k));
        dedup_by_key_id(&mut deprecated);

        if active.is_empty() {
            return Err(ConfigurationError::KeysNotProvided);
        }

        if validity > expiration {
            log::error!("VAPID validity duration exceeds expiration duration; tokens would never renew in time");
        }
        if expiration > PUSH_SERVICE_MAX_EXPIRATION {
            log::error!("VAPID expiration duration of {expiration:?} exceeds the 24h push-service maximum");
        }

        Ok(VapidConfiguration {
            primary,
            active,
            deprecated,
            contact,
            expiration,
            validity,
        })
    }

    /// Replaces the key sets, applying the same invariants atomically.
    pub fn update_keys(
        &mut self,
        primary: Option<VapidKey>,
        active: Vec<VapidKey>,
        deprecated: Vec<VapidKey>,
    ) -> Result<(), ConfigurationError> {
        let updated = Self::new(primary, active, deprecated, self.contact.clone(), self.expiration, self.validity)?;
        *self = updated;
        Ok(())
    }

    pub fn primary(&self) -> Option<&VapidKey> {
        self.primary.as_ref()
    }

    pub fn active_keys(&self) -> &[VapidKey] {
        &self.active
    }

    pub fn deprecated_keys(&self) -> &[VapidKey] {
        &self.deprecated
    }

    pub fn contact_information(&self) -> &ContactInformation {
        &self.contact
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// All keys this configuration will sign with: active ∪ deprecated.
    pub fn all_keys(&self) -> impl Iterator<Item = &VapidKey> {
        self.active.iter().chain(self.deprecated.iter())
    }

    pub fn key_status(&self, key_id: &KeyId) -> KeyStatus {
        if self.active.iter().any(|k| &k.key_id() == key_id) {
            KeyStatus::Valid
        } else if self.deprecated.iter().any(|k| &k.key_id() == key_id) {
            KeyStatus::Deprecated
        } else {
            KeyStatus::Unknown
        }
    }

    /// The key to hand out for a new subscriber registration: the primary
    /// key if configured, else a uniformly random active (non-deprecated) key.
    pub fn next_vapid_key_id(&self) -> KeyId {
        if let Some(ref primary) = self.primary {
            return primary.key_id();
        }
        self.active
            .choose(&mut rand::thread_rng())
            .expect("active set is non-empty by construction")
            .key_id()
    }
}

fn dedup_by_key_id(keys: &mut Vec<VapidKey>) {
    let mut seen = std::collections::HashSet::new();
    keys.retain(|k| seen.insert(k.key_id()));
}

#[derive(Debug, Serialize, Deserialize)]
struct VapidConfigFile {
    #[serde(rename = "primaryKey", skip_serializing_if = "Option::is_none")]
    primary_key: Option<String>,
    keys: Vec<String>,
    #[serde(rename = "deprecatedKeys", default, skip_serializing_if = "Vec::is_empty")]
    deprecated_keys: Vec<String>,
    #[serde(rename = "contactInformation")]
    contact_information: String,
    #[serde(rename = "expirationDuration")]
    expiration_duration: u64,
    #[serde(rename = "validityDuration")]
    validity_duration: u64,
}

impl VapidConfiguration {
    /// Serializes to the operator-facing JSON config shape. The primary key
    /// is excluded from `keys` to avoid duplication.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let keys_without_primary: Vec<String> = self
            .active
            .iter()
            .filter(|k| Some(*k) != self.primary.as_ref())
            .map(VapidKey::to_base64url)
            .collect();

        let file = VapidConfigFile {
            primary_key: self.primary.as_ref().map(VapidKey::to_base64url),
            keys: keys_without_primary,
            deprecated_keys: self.deprecated.iter().map(VapidKey::to_base64url).collect(),
            contact_information: self.contact.as_sub_claim(),
            expiration_duration: self.expiration.as_secs(),
            validity_duration: self.validity.as_secs(),
        };

        serde_json::to_string(&file)
    }

    /// Decodes and validates the operator-facing JSON config shape.
    pub fn from_json(input: &str) -> Result<Self, WebPushConfigParseError> {
        let file: VapidConfigFile = serde_json::from_str(input)?;

        let primary = file
            .primary_key
            .as_deref()
            .map(VapidKey::from_base64url)
            .transpose()?;

        let mut active = file
            .keys
            .iter()
            .map(VapidKey::from_base64url)
            .collect::<Result<Vec<_>, _>>()?;

        let deprecated = file
            .deprecated_keys
            .iter()
            .map(VapidKey::from_base64url)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(ref primary_key) = primary {
            if !active.contains(primary_key) {
                active.push(primary_key.clone());
            }
        }

        let contact = ContactInformation::parse(&file.contact_information)?;

        let config = VapidConfiguration::new(
            primary,
            active,
            deprecated,
            contact,
            Duration::from_secs(file.expiration_duration),
            Duration::from_secs(file.validity_duration),
        )?;

        Ok(config)
    }
}

impl Default for VapidConfiguration {
    fn default() -> Self {
        // A fresh single-key configuration; mostly useful for tests.
        let key = VapidKey::generate();
        VapidConfiguration::new(
            Some(key.clone()),
            vec![key],
            vec![],
            ContactInformation::Email("admin@example.com".to_string()),
            DEFAULT_EXPIRATION,
            DEFAULT_VALIDITY,
        )
        .expect("single-key default configuration is always valid")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebPushConfigParseError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid key: {0}")]
    Key(#[from] crate::error::InvalidKey),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_set_is_never_empty_after_valid_construction() {
        let key = VapidKey::generate();
        let config = VapidConfiguration::new(
            None,
            vec![key],
            vec![],
            ContactInformation::email("a@b.com").unwrap(),
            DEFAULT_EXPIRATION,
            DEFAULT_VALIDITY,
        )
        .unwrap();
        assert!(!config.active_keys().is_empty());
    }

    #[test]
    fn construction_fails_with_no_keys() {
        let err = VapidConfiguration::new(
            None,
            vec![],
            vec![],
            ContactInformation::email("a@b.com").unwrap(),
            DEFAULT_EXPIRATION,
            DEFAULT_VALIDITY,
        )
        .unwrap_err();
        assert_eq!(err, ConfigurationError::KeysNotProvided);
    }

    #[test]
    fn primary_is_folded_into_active() {
        let primary = VapidKey::generate();
        let config = VapidConfiguration::new(
            Some(primary.clone()),
            vec![],
            vec![],
            ContactInformation::email("a@b.com").unwrap(),
            DEFAULT_EXPIRATION,
            DEFAULT_VALIDITY,
        )
        .unwrap();
        assert!(config.active_keys().contains(&primary));
    }

    #[test]
    fn deprecated_keys_are_disjoint_from_active() {
        let key = VapidKey::generate();
        let config = VapidConfiguration::new(
            None,
            vec![key.clone()],
            vec![key.clone()],
            ContactInformation::email("a@b.com").unwrap(),
            DEFAULT_EXPIRATION,
            DEFAULT_VALIDITY,
        )
        .unwrap();
        assert!(config.active_keys().contains(&key));
        assert!(config.deprecated_keys().is_empty());
    }

    #[test]
    fn next_vapid_key_id_prefers_primary() {
        let primary = VapidKey::generate();
        let other = VapidKey::generate();
        let config = VapidConfiguration::new(
            Some(primary.clone()),
            vec![other],
            vec![],
            ContactInformation::email("a@b.com").unwrap(),
            DEFAULT_EXPIRATION,
            DEFAULT_VALIDITY,
        )
        .unwrap();
        assert_eq!(config.next_vapid_key_id(), primary.key_id());
    }

    #[test]
    fn key_status_reports_valid_deprecated_unknown() {
        let active = VapidKey::generate();
        let deprecated = VapidKey::generate();
        let unknown = VapidKey::generate();
        let config = VapidConfiguration::new(
            None,
            vec![active.clone()],
            vec![deprecated.clone()],
            ContactInformation::email("a@b.com").unwrap(),
            DEFAULT_EXPIRATION,
            DEFAULT_VALIDITY,
        )
        .unwrap();

        assert_eq!(config.key_status(&active.key_id()), KeyStatus::Valid);
        assert_eq!(config.key_status(&deprecated.key_id()), KeyStatus::Deprecated);
        assert_eq!(config.key_status(&unknown.key_id()), KeyStatus::Unknown);
    }

    #[test]
    fn contact_information_parses_mailto_and_url() {
        assert_eq!(
            ContactInformation::parse("mailto:ops@example.com").unwrap(),
            ContactInformation::Email("ops@example.com".to_string())
        );
        assert_eq!(
            ContactInformation::parse("https://example.com/support").unwrap(),
            ContactInformation::Url("https://example.com/support".to_string())
        );
        assert!(ContactInformation::parse("ftp://nope").is_err());
    }

    #[test]
    fn json_round_trips_excluding_primary_from_keys() {
        let primary = VapidKey::generate();
        let other = VapidKey::generate();
        let config = VapidConfiguration::new(
            Some(primary.clone()),
            vec![other.clone()],
            vec![],
            ContactInformation::email("ops@example.com").unwrap(),
            Duration::from_secs(79200),
            Duration::from_secs(72000),
        )
        .unwrap();

        let json = config.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let keys = parsed["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].as_str().unwrap(), other.to_base64url());

        let reloaded = VapidConfiguration::from_json(&json).unwrap();
        assert_eq!(reloaded.primary().unwrap(), &primary);
        assert!(reloaded.active_keys().contains(&other));
    }

    #[test]
    fn from_json_rejects_bad_contact_information() {
        let json = serde_json::json!({
            "keys": [VapidKey::generate().to_base64url()],
            "contactInformation": "not-a-url-or-mailto",
            "expirationDuration": 79200,
            "validityDuration": 72000
        })
        .to_string();

        assert!(VapidConfiguration::from_json(&json).is_err());
    }
}
