use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the custom event carried by the envelope wire shape.
pub const ENVELOPE_EVENT: &str = "MultiChat";

/// Streaming platform an event originated from
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Twitch,
    YouTube,
    TikTok,
    System,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitch => "Twitch",
            Platform::YouTube => "YouTube",
            Platform::TikTok => "TikTok",
            Platform::System => "System",
        }
    }

    /// Case-insensitive lookup by platform name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "twitch" => Some(Platform::Twitch),
            "youtube" => Some(Platform::YouTube),
            "tiktok" => Some(Platform::TikTok),
            "system" => Some(Platform::System),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of occurrence a chat event describes
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Chat,
    Subscription,
    Raid,
    Gift,
    Like,
    Follow,
    Share,
    Redemption,
    Cheer,
    Membership,
    SuperChat,
    SystemNotice,
}

/// Who sent a message
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl UserIdentity {
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            color: None,
            id: None,
        }
    }

    /// Accepts a bare name or an object carrying `displayName`/`name`,
    /// `color` and `id`. Empty colors are treated as absent.
    pub fn from_loose(value: &Value) -> Self {
        match value {
            Value::String(name) => Self::named(name.as_str()),
            user => Self {
                display_name: str_at(user, "/displayName")
                    .or_else(|| str_at(user, "/name"))
                    .unwrap_or_default()
                    .to_string(),
                color: str_at(user, "/color")
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
                id: str_at(user, "/id").map(str::to_string),
            },
        }
    }
}

/// Inline emote; `end_index` is inclusive
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Emote {
    pub name: String,
    pub image_url: String,
    pub start_index: usize,
    pub end_index: usize,
}

/// Message body plus emote metadata
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageContent {
    pub text: String,
    #[serde(default)]
    pub emotes: Vec<Emote>,
    /// `/me` style action
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub action: bool,
}

impl MessageContent {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emotes: Vec::new(),
            action: false,
        }
    }

    /// Accepts a bare string or an object with `text`, `emotes` and
    /// `action`. Emotes that do not parse are dropped.
    pub fn from_loose(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::plain(text.as_str()),
            message => Self {
                text: str_at(message, "/text").unwrap_or_default().to_string(),
                emotes: message
                    .get("emotes")
                    .and_then(Value::as_array)
                    .map(|emotes| {
                        emotes
                            .iter()
                            .filter_map(|e| serde_json::from_value::<Emote>(e.clone()).ok())
                            .collect()
                    })
                    .unwrap_or_default(),
                action: message
                    .get("action")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
        }
    }
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

/// Canonical, platform-agnostic chat or activity record.
///
/// Fields are private so an event cannot change after construction; the
/// platform is serialized as `source` to match the overlay's data shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatEvent {
    #[serde(rename = "source")]
    platform: Platform,
    kind: EventKind,
    user: UserIdentity,
    message: MessageContent,
    timestamp: DateTime<Utc>,
}

impl ChatEvent {
    pub fn new(
        platform: Platform,
        kind: EventKind,
        user: UserIdentity,
        message: MessageContent,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            platform,
            kind,
            user,
            message,
            timestamp,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn user(&self) -> &UserIdentity {
        &self.user
    }

    pub fn message(&self) -> &MessageContent {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Encode for the wire. Called once per event, shared by every connection.
    pub fn to_wire(&self, format: WireFormat) -> Result<String, serde_json::Error> {
        match format {
            WireFormat::Envelope => serde_json::to_string(&Envelope {
                event: ENVELOPE_EVENT,
                data: self,
            }),
            WireFormat::Simple => serde_json::to_string(&SimpleFrame {
                platform: self.platform.as_str(),
                user: &self.user.display_name,
                message: &self.message.text,
                timestamp: &self.timestamp,
            }),
        }
    }
}

impl fmt::Display for ChatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.action {
            write!(
                f,
                "[{}] * {} {}",
                self.platform, self.user.display_name, self.message.text
            )
        } else {
            write!(
                f,
                "[{}] {}: {}",
                self.platform, self.user.display_name, self.message.text
            )
        }
    }
}

/// Which JSON shape the broadcaster writes to viewers
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// `{ "event": "MultiChat", "data": { ... } }`
    #[default]
    Envelope,
    /// `{ "platform", "user", "message", "timestamp" }`
    Simple,
}

#[derive(Serialize)]
struct Envelope<'a> {
    event: &'static str,
    data: &'a ChatEvent,
}

#[derive(Serialize)]
struct SimpleFrame<'a> {
    platform: &'static str,
    user: &'a str,
    message: &'a str,
    timestamp: &'a DateTime<Utc>,
}
