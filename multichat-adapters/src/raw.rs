//! Raw events as adapters hand them to the pipeline, before normalization

use multichat_broadcaster::{Emote, Platform};
use serde::Deserialize;

/// One occurrence reported by a source adapter
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    /// The `onMessage(platform, user, message, isAction)` callback shape
    Simple {
        platform: String,
        user: String,
        message: String,
        is_action: bool,
    },
    /// `{ source, user: { displayName, color }, message: { text, emotes } }`
    Structured(serde_json::Value),
    Twitch(TwitchEvent),
    /// One `liveChatMessage` resource from the YouTube Data API
    YouTube(serde_json::Value),
    TikTok(TikTokEvent),
    Control(ControlEvent),
}

impl RawEvent {
    pub fn simple(
        platform: impl Into<String>,
        user: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RawEvent::Simple {
            platform: platform.into(),
            user: user.into(),
            message: message.into(),
            is_action: false,
        }
    }

    /// Platform the event belongs to, when it can be told without normalizing
    pub fn platform_hint(&self) -> Option<Platform> {
        match self {
            RawEvent::Simple { platform, .. } => Platform::from_name(platform),
            RawEvent::Structured(_) => None,
            RawEvent::Twitch(_) => Some(Platform::Twitch),
            RawEvent::YouTube(_) => Some(Platform::YouTube),
            RawEvent::TikTok(_) => Some(Platform::TikTok),
            RawEvent::Control(control) => Some(control.platform()),
        }
    }
}

/// Twitch chat and activity, already lifted out of IRC / EventSub types
#[derive(Debug, Clone, PartialEq)]
pub enum TwitchEvent {
    Message {
        user_id: Option<String>,
        display_name: String,
        color: Option<String>,
        text: String,
        is_action: bool,
        /// Inclusive `end_index`
        emotes: Vec<Emote>,
        bits: Option<u64>,
        reward_id: Option<String>,
    },
    Subscription {
        user: String,
        plan: String,
    },
    Resubscription {
        user: String,
        months: u64,
    },
    Raid {
        user: String,
        viewer_count: u64,
    },
    Ritual {
        user: String,
        ritual_name: String,
    },
    /// `Redemption`, `Follow` and `Cheer` mirror EventSub payloads. The IRC
    /// adapter never produces them; an EventSub bridge emits them through
    /// `EventSink::emit`.
    Redemption {
        user: String,
        reward_title: String,
    },
    Follow {
        user: String,
    },
    Cheer {
        user: String,
        bits: u64,
    },
}

/// TikTok LIVE webcast events, as forwarded by the relay
#[derive(Debug, Clone, PartialEq)]
pub enum TikTokEvent {
    Chat(TikTokChat),
    Gift(TikTokGift),
    Like(TikTokLike),
    Follow(TikTokUser),
    Share(TikTokUser),
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TikTokUser {
    pub unique_id: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TikTokChat {
    pub unique_id: String,
    pub comment: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TikTokGift {
    pub unique_id: String,
    pub gift_name: String,
    /// `1` marks a streakable gift
    pub gift_type: i64,
    pub repeat_count: u64,
    pub repeat_end: bool,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TikTokLike {
    pub unique_id: String,
    pub like_count: u64,
}

impl TikTokEvent {
    /// Parse a relay frame `{ "event": <name>, "data": { ... } }`.
    ///
    /// Unknown event names and malformed frames yield `None`; missing data
    /// fields fall back to defaults.
    pub fn from_relay_frame(frame: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(frame).ok()?;
        let name = value.get("event")?.as_str()?;
        let data = value
            .get("data")
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

        match name {
            "chat" => serde_json::from_value(data).ok().map(TikTokEvent::Chat),
            "gift" => serde_json::from_value(data).ok().map(TikTokEvent::Gift),
            "like" => serde_json::from_value(data).ok().map(TikTokEvent::Like),
            "follow" => serde_json::from_value(data).ok().map(TikTokEvent::Follow),
            "share" => serde_json::from_value(data).ok().map(TikTokEvent::Share),
            _ => None,
        }
    }
}

/// Adapter connection status changes
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    Connected { platform: Platform, target: String },
    ConnectFailed { platform: Platform, reason: String },
    Disconnected { platform: Platform, reason: String },
}

impl ControlEvent {
    pub fn platform(&self) -> Platform {
        match self {
            ControlEvent::Connected { platform, .. }
            | ControlEvent::ConnectFailed { platform, .. }
            | ControlEvent::Disconnected { platform, .. } => *platform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_chat_frame() {
        let frame = r#"{"event":"chat","data":{"uniqueId":"tt_user","comment":"hello","extra":1}}"#;
        assert_eq!(
            TikTokEvent::from_relay_frame(frame),
            Some(TikTokEvent::Chat(TikTokChat {
                unique_id: "tt_user".to_string(),
                comment: "hello".to_string(),
            }))
        );
    }

    #[test]
    fn test_relay_gift_frame_with_missing_fields() {
        let frame = r#"{"event":"gift","data":{"uniqueId":"g","giftName":"Rose"}}"#;
        match TikTokEvent::from_relay_frame(frame) {
            Some(TikTokEvent::Gift(gift)) => {
                assert_eq!(gift.gift_name, "Rose");
                assert_eq!(gift.gift_type, 0);
                assert!(!gift.repeat_end);
            }
            other => panic!("Unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_relay_unknown_or_broken_frames() {
        assert_eq!(TikTokEvent::from_relay_frame(r#"{"event":"roomUser","data":{}}"#), None);
        assert_eq!(TikTokEvent::from_relay_frame("not json"), None);
        assert_eq!(TikTokEvent::from_relay_frame(r#"{"data":{}}"#), None);
    }

    #[test]
    fn test_platform_hint() {
        assert_eq!(
            RawEvent::simple("Twitch", "a", "b").platform_hint(),
            Some(Platform::Twitch)
        );
        assert_eq!(RawEvent::Structured(serde_json::json!({})).platform_hint(), None);
    }
}
