//! Decoding broadcaster text frames back into `ChatEvent`s

use chrono::{DateTime, Utc};
use multichat_broadcaster::{
    ChatEvent, EventKind, MessageContent, Platform, UserIdentity, ENVELOPE_EVENT,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{DisplayError, Result};

#[derive(Deserialize)]
struct SimpleFrame {
    platform: String,
    user: String,
    message: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Decode either wire shape.
///
/// Envelopes naming another event yield `Ok(None)`. Unknown platform names
/// are attributed to `System` in both shapes.
pub fn decode_frame(text: &str) -> Result<Option<ChatEvent>> {
    let value: Value = serde_json::from_str(text)?;

    if let Some(event) = value.get("event") {
        if event.as_str() != Some(ENVELOPE_EVENT) {
            return Ok(None);
        }
        return match value.get("data") {
            Some(data) if data.is_object() => Ok(Some(decode_envelope_data(data))),
            _ => Err(DisplayError::UnknownShape("envelope without data".to_string())),
        };
    }

    if value.get("platform").is_some() {
        let frame: SimpleFrame = serde_json::from_value(value)?;
        return Ok(Some(ChatEvent::new(
            Platform::from_name(&frame.platform).unwrap_or(Platform::System),
            EventKind::Chat,
            UserIdentity::named(frame.user),
            MessageContent::plain(frame.message),
            frame.timestamp.unwrap_or_else(Utc::now),
        )));
    }

    Err(DisplayError::UnknownShape(text.chars().take(80).collect()))
}

/// Envelope payloads come from our own broadcaster and from relays such as
/// Streamer.bot, so only the shape is required. Missing `kind` means chat,
/// a missing or unparseable `timestamp` means now.
fn decode_envelope_data(data: &Value) -> ChatEvent {
    let platform = data
        .get("source")
        .or_else(|| data.get("platform"))
        .and_then(Value::as_str)
        .and_then(Platform::from_name)
        .unwrap_or(Platform::System);

    let kind = data
        .get("kind")
        .and_then(|k| serde_json::from_value::<EventKind>(k.clone()).ok())
        .unwrap_or(EventKind::Chat);

    let user = data
        .get("user")
        .map(UserIdentity::from_loose)
        .unwrap_or_else(|| UserIdentity::named(""));

    let message = data
        .get("message")
        .map(MessageContent::from_loose)
        .unwrap_or_else(|| MessageContent::plain(""));

    let timestamp = data
        .get("timestamp")
        .and_then(|t| serde_json::from_value::<DateTime<Utc>>(t.clone()).ok())
        .unwrap_or_else(Utc::now);

    ChatEvent::new(platform, kind, user, message, timestamp)
}
