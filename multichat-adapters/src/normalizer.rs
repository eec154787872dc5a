//! Raw adapter events to canonical `ChatEvent`s.
//!
//! Normalization never fails: missing fields become empty strings or the
//! neutral color, and payloads with nothing to show produce no event.

use chrono::{DateTime, Utc};
use multichat_broadcaster::{
    ChatEvent, EventKind, MessageContent, Platform, UserIdentity,
};
use serde_json::Value;

use crate::raw::{ControlEvent, RawEvent, TikTokEvent, TwitchEvent};

/// Display name used for activity notices synthesized by adapters
pub const SYSTEM_USER: &str = "[SYSTEM]";

/// Name color for platforms that do not provide one
pub const NEUTRAL_COLOR: &str = "#FFFFFF";

/// Stamps events with a non-decreasing normalization time
#[derive(Debug, Default)]
pub struct Normalizer {
    last_timestamp: Option<DateTime<Utc>>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, raw: RawEvent) -> Option<ChatEvent> {
        let now = Utc::now();
        let timestamp = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };

        let event = normalize_at(raw, timestamp)?;
        self.last_timestamp = Some(timestamp);
        Some(event)
    }
}

/// Normalize with an explicit timestamp
pub fn normalize_at(raw: RawEvent, timestamp: DateTime<Utc>) -> Option<ChatEvent> {
    let (platform, kind, user, message) = match raw {
        RawEvent::Simple {
            platform,
            user,
            message,
            is_action,
        } => {
            let platform = platform_from_name(&platform)?;
            let kind = if user == SYSTEM_USER {
                EventKind::SystemNotice
            } else {
                EventKind::Chat
            };
            let content = MessageContent {
                text: message,
                emotes: Vec::new(),
                action: is_action,
            };
            (platform, kind, neutral_user(user), content)
        }
        RawEvent::Structured(value) => structured(&value)?,
        RawEvent::Twitch(event) => twitch(event)?,
        RawEvent::YouTube(value) => youtube(&value)?,
        RawEvent::TikTok(event) => tiktok(event)?,
        RawEvent::Control(control) => match control {
            ControlEvent::Connected { platform, target } => (
                platform,
                EventKind::SystemNotice,
                neutral_user(SYSTEM_USER),
                MessageContent::plain(format!("Connected to {}", target)),
            ),
            ControlEvent::ConnectFailed { .. } | ControlEvent::Disconnected { .. } => {
                return None
            }
        },
    };

    Some(ChatEvent::new(platform, kind, user, message, timestamp))
}

type Parts = (Platform, EventKind, UserIdentity, MessageContent);

/// Empty names map to `System`; unknown platforms are dropped.
fn platform_from_name(name: &str) -> Option<Platform> {
    if name.trim().is_empty() {
        return Some(Platform::System);
    }
    let platform = Platform::from_name(name);
    if platform.is_none() {
        tracing::debug!("Dropping event from unsupported platform {:?}", name);
    }
    platform
}

fn neutral_user(name: impl Into<String>) -> UserIdentity {
    UserIdentity {
        display_name: name.into(),
        color: Some(NEUTRAL_COLOR.to_string()),
        id: None,
    }
}

fn system_notice(platform: Platform, kind: EventKind, text: String) -> Parts {
    (platform, kind, neutral_user(SYSTEM_USER), MessageContent::plain(text))
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

fn structured(value: &Value) -> Option<Parts> {
    let source = str_at(value, "/source")
        .or_else(|| str_at(value, "/platform"))
        .unwrap_or_default();
    let platform = platform_from_name(source)?;

    let mut user = value
        .get("user")
        .map(UserIdentity::from_loose)
        .unwrap_or_else(|| UserIdentity::named(""));
    user.color.get_or_insert_with(|| NEUTRAL_COLOR.to_string());

    let message = value
        .get("message")
        .map(MessageContent::from_loose)
        .unwrap_or_else(|| MessageContent::plain(""));

    let kind = value
        .get("kind")
        .and_then(|k| serde_json::from_value::<EventKind>(k.clone()).ok())
        .unwrap_or(EventKind::Chat);

    Some((platform, kind, user, message))
}

fn twitch(event: TwitchEvent) -> Option<Parts> {
    let platform = Platform::Twitch;
    let parts = match event {
        TwitchEvent::Message {
            user_id,
            display_name,
            color,
            text,
            is_action,
            emotes,
            bits,
            reward_id,
        } => {
            let kind = if bits.is_some() {
                EventKind::Cheer
            } else if reward_id.is_some() {
                EventKind::Redemption
            } else {
                EventKind::Chat
            };
            let user = UserIdentity {
                display_name,
                color: Some(color.unwrap_or_else(|| NEUTRAL_COLOR.to_string())),
                id: user_id,
            };
            let message = MessageContent {
                text,
                emotes,
                action: is_action,
            };
            (platform, kind, user, message)
        }
        TwitchEvent::Subscription { user, plan } => system_notice(
            platform,
            EventKind::Subscription,
            format!("{} just subscribed with a Tier {} subscription!", user, plan),
        ),
        TwitchEvent::Resubscription { user, months } => system_notice(
            platform,
            EventKind::Subscription,
            format!("{} re-subscribed for {} months in a row!", user, months),
        ),
        TwitchEvent::Raid { user, viewer_count } => system_notice(
            platform,
            EventKind::Raid,
            format!("{} is raiding with {} viewers!", user, viewer_count),
        ),
        TwitchEvent::Ritual { user, ritual_name } => {
            if ritual_name != "new_chatter" {
                return None;
            }
            system_notice(
                platform,
                EventKind::SystemNotice,
                format!("{} is new here! Welcome!", user),
            )
        }
        TwitchEvent::Redemption { user, reward_title } => (
            platform,
            EventKind::Redemption,
            neutral_user(user),
            MessageContent::plain(format!("redeemed: {}", reward_title)),
        ),
        TwitchEvent::Follow { user } => (
            platform,
            EventKind::Follow,
            neutral_user(user),
            MessageContent::plain("just followed!"),
        ),
        TwitchEvent::Cheer { user, bits } => (
            platform,
            EventKind::Cheer,
            neutral_user(user),
            MessageContent::plain(format!("cheered {} bits!", bits)),
        ),
    };
    Some(parts)
}

fn youtube(item: &Value) -> Option<Parts> {
    let kind_name = str_at(item, "/snippet/type").unwrap_or_default();
    let user = UserIdentity {
        display_name: str_at(item, "/authorDetails/displayName")
            .unwrap_or_default()
            .to_string(),
        color: Some(NEUTRAL_COLOR.to_string()),
        id: str_at(item, "/authorDetails/channelId").map(str::to_string),
    };

    let (kind, text) = match kind_name {
        "textMessageEvent" => {
            let text = str_at(item, "/snippet/displayMessage")
                .or_else(|| str_at(item, "/snippet/textMessageDetails/messageText"))
                .unwrap_or_default();
            (EventKind::Chat, text.to_string())
        }
        "superChatEvent" => {
            let amount = str_at(item, "/snippet/superChatDetails/amountDisplayString")
                .unwrap_or_default();
            let comment =
                str_at(item, "/snippet/superChatDetails/userComment").unwrap_or_default();
            (EventKind::SuperChat, format!("SuperChat: {} - {}", amount, comment))
        }
        "membershipItem" | "newSponsorEvent" => {
            (EventKind::Membership, "became a member!".to_string())
        }
        _ => return None,
    };

    Some((Platform::YouTube, kind, user, MessageContent::plain(text)))
}

fn tiktok(event: TikTokEvent) -> Option<Parts> {
    let platform = Platform::TikTok;
    let parts = match event {
        TikTokEvent::Chat(chat) => (
            platform,
            EventKind::Chat,
            neutral_user(chat.unique_id),
            MessageContent::plain(chat.comment),
        ),
        TikTokEvent::Gift(gift) => {
            let text = if gift.gift_type == 1 && !gift.repeat_end {
                // Streak still running
                format!(
                    "{} is sending {} x{}!",
                    gift.unique_id, gift.gift_name, gift.repeat_count
                )
            } else if gift.gift_type != 1 {
                format!("{} sent {}!", gift.unique_id, gift.gift_name)
            } else {
                return None;
            };
            system_notice(platform, EventKind::Gift, text)
        }
        TikTokEvent::Like(like) => system_notice(
            platform,
            EventKind::Like,
            format!("{} sent {} likes!", like.unique_id, like.like_count),
        ),
        TikTokEvent::Follow(user) => system_notice(
            platform,
            EventKind::Follow,
            format!("{} just followed!", user.unique_id),
        ),
        TikTokEvent::Share(user) => system_notice(
            platform,
            EventKind::Share,
            format!("{} just shared the stream!", user.unique_id),
        ),
    };
    Some(parts)
}
