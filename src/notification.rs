//! Declarative-push notification documents (see
//! <https://webkit.org/blog/16535/meet-declarative-web-push>), encoded to the
//! JSON payload a push message carries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Whether the encoded document carries the `"web_push": 8030` discriminator
/// that lets the browser display it without running a service worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Declarative,
    Legacy,
}

/// Text direction. `RightToLeft` serializes as `"rtl"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Auto,
    LeftToRight,
    RightToLeft,
}

impl Direction {
    fn as_str(self) -> Option<&'static str> {
        match self {
            Direction::Auto => None,
            Direction::LeftToRight => Some("ltr"),
            Direction::RightToLeft => Some("rtl"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub navigate: String,
    pub icon: Option<String>,
}

impl NotificationAction {
    pub fn new(action: impl Into<String>, title: impl Into<String>, navigate: impl Into<String>) -> Self {
        NotificationAction {
            action: action.into(),
            title: title.into(),
            navigate: navigate.into(),
            icon: None,
        }
    }

    fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("action".to_string(), json!(self.action));
        obj.insert("title".to_string(), json!(self.title));
        obj.insert("navigate".to_string(), json!(self.navigate));
        if let Some(ref icon) = self.icon {
            obj.insert("icon".to_string(), json!(icon));
        }
        Value::Object(obj)
    }
}

/// A declarative-push notification document.
#[derive(Debug, Clone)]
pub struct Notification<D = Value> {
    pub title: String,
    pub navigate: String,
    pub dir: Direction,
    pub lang: Option<String>,
    pub body: Option<String>,
    pub tag: Option<String>,
    pub image: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub vibrate: Vec<u32>,
    pub timestamp: Option<DateTime<Utc>>,
    pub renotify: bool,
    pub silent: bool,
    pub require_interaction: bool,
    pub data: Option<D>,
    pub actions: Vec<NotificationAction>,
    pub app_badge: Option<u64>,
    pub mutable: bool,
}

impl<D> Notification<D> {
    pub fn new(title: impl Into<String>, navigate: impl Into<String>) -> Self {
        Notification {
            title: title.into(),
            navigate: navigate.into(),
            dir: Direction::default(),
            lang: None,
            body: None,
            tag: None,
            image: None,
            icon: None,
            badge: None,
            vibrate: Vec::new(),
            timestamp: None,
            renotify: false,
            silent: false,
            require_interaction: false,
            data: None,
            actions: Vec::new(),
            app_badge: None,
            mutable: false,
        }
    }
}

impl<D: Serialize> Notification<D> {
    fn notification_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("title".to_string(), json!(self.title));
        obj.insert("navigate".to_string(), json!(self.navigate));
        if let Some(dir) = self.dir.as_str() {
            obj.insert("dir".to_string(), json!(dir));
        }
        if let Some(ref lang) = self.lang {
            obj.insert("lang".to_string(), json!(lang));
        }
        if let Some(ref body) = self.body {
            obj.insert("body".to_string(), json!(body));
        }
        if let Some(ref tag) = self.tag {
            obj.insert("tag".to_string(), json!(tag));
        }
        if let Some(ref image) = self.image {
            obj.insert("image".to_string(), json!(image));
        }
        if let Some(ref icon) = self.icon {
            obj.insert("icon".to_string(), json!(icon));
        }
        if let Some(ref badge) = self.badge {
            obj.insert("badge".to_string(), json!(badge));
        }
        if !self.vibrate.is_empty() {
            obj.insert("vibrate".to_string(), json!(self.vibrate));
        }
        if let Some(ts) = self.timestamp {
            obj.insert("timestamp".to_string(), json!(ts.timestamp_millis()));
        }
        if self.renotify {
            obj.insert("renotify".to_string(), json!(true));
        }
        if self.silent {
            obj.insert("silent".to_string(), json!(true));
        }
        if self.require_interaction {
            obj.insert("require_interaction".to_string(), json!(true));
        }
        if let Some(ref data) = self.data {
            if let Ok(value) = serde_json::to_value(data) {
                obj.insert("data".to_string(), value);
            }
        }
        if !self.actions.is_empty() {
            let actions: Vec<Value> = self.actions.iter().map(NotificationAction::to_value).collect();
            obj.insert("actions".to_string(), Value::Array(actions));
        }
        Value::Object(obj)
    }

    /// Encodes the full payload document, including the `web_push`
    /// discriminator for [`NotificationKind::Declarative`].
    pub fn to_value(&self, kind: NotificationKind) -> Value {
        let mut top = Map::new();
        if kind == NotificationKind::Declarative {
            top.insert("web_push".to_string(), json!(8030));
        }
        top.insert("notification".to_string(), self.notification_value());
        if let Some(app_badge) = self.app_badge {
            top.insert("app_badge".to_string(), json!(app_badge));
        }
        if self.mutable {
            top.insert("mutable".to_string(), json!(true));
        }
        Value::Object(top)
    }

    /// Encodes to the JSON bytes suitable for use as a push message payload.
    pub fn to_payload(&self, kind: NotificationKind) -> Vec<u8> {
        serde_json::to_vec(&self.to_value(kind)).expect("notification documents are always serializable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarative_notification_encodes_minimal_shape() {
        let mut notification = Notification::<Value>::new("New Anime", "https://jiiiii.moe");
        notification.timestamp = Some(DateTime::from_timestamp(1_000_000_000, 0).unwrap());

        let value = notification.to_value(NotificationKind::Declarative);
        assert_eq!(
            value,
            json!({
                "web_push": 8030,
                "notification": {
                    "title": "New Anime",
                    "navigate": "https://jiiiii.moe",
                    "timestamp": 1_000_000_000_000i64
                }
            })
        );
    }

    #[test]
    fn legacy_notification_omits_web_push_discriminator() {
        let notification = Notification::<Value>::new("Title", "https://example.com");
        let value = notification.to_value(NotificationKind::Legacy);
        assert!(value.get("web_push").is_none());
    }

    #[test]
    fn right_to_left_serializes_as_rtl() {
        let mut notification = Notification::<Value>::new("Title", "https://example.com");
        notification.dir = Direction::RightToLeft;
        let value = notification.to_value(NotificationKind::Legacy);
        assert_eq!(value["notification"]["dir"], "rtl");
    }

    #[test]
    fn auto_direction_is_omitted() {
        let notification = Notification::<Value>::new("Title", "https://example.com");
        let value = notification.to_value(NotificationKind::Legacy);
        assert!(value["notification"].get("dir").is_none());
    }

    #[test]
    fn false_flags_and_empty_collections_are_omitted() {
        let notification = Notification::<Value>::new("Title", "https://example.com");
        let value = notification.to_value(NotificationKind::Legacy);
        let inner = &value["notification"];
        for key in ["renotify", "silent", "require_interaction", "vibrate", "actions"] {
            assert!(inner.get(key).is_none(), "expected {key} to be omitted");
        }
    }

    #[test]
    fn actions_and_data_round_trip() {
        let mut notification = Notification::new("Title", "https://example.com");
        notification.actions.push(NotificationAction::new("open", "Open", "https://example.com/open"));
        notification.data = Some(json!({"order_id": 42}));

        let value = notification.to_value(NotificationKind::Declarative);
        assert_eq!(value["notification"]["actions"][0]["action"], "open");
        assert_eq!(value["notification"]["data"]["order_id"], 42);
    }
}
