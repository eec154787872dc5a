//! Per-platform credentials from environment-style lookups.
//!
//! Each `from_lookup` returns `None` when a required value is missing or
//! blank; the caller then skips that adapter.

pub const TWITCH_CHANNEL: &str = "TWITCH_CHANNEL";
pub const TWITCH_USERNAME: &str = "TWITCH_USERNAME";
pub const TWITCH_OAUTH_TOKEN: &str = "TWITCH_OAUTH_TOKEN";
pub const YOUTUBE_API_KEY: &str = "YOUTUBE_API_KEY";
pub const YOUTUBE_CHANNEL_ID: &str = "YOUTUBE_CHANNEL_ID";
pub const TIKTOK_USERNAME: &str = "TIKTOK_USERNAME";
pub const TIKTOK_RELAY_URL: &str = "TIKTOK_RELAY_URL";

fn required<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Authenticated chat login; without one the adapter reads anonymously
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitchLogin {
    pub username: String,
    pub oauth_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitchCredentials {
    /// Lower-case channel login without `#`
    pub channel: String,
    pub login: Option<TwitchLogin>,
}

impl TwitchCredentials {
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let channel = required(&lookup, TWITCH_CHANNEL)?
            .trim_start_matches('#')
            .to_lowercase();
        if channel.is_empty() {
            return None;
        }

        let login = match (
            required(&lookup, TWITCH_USERNAME),
            required(&lookup, TWITCH_OAUTH_TOKEN),
        ) {
            (Some(username), Some(token)) => Some(TwitchLogin {
                username: username.to_lowercase(),
                oauth_token: token.trim_start_matches("oauth:").to_string(),
            }),
            _ => None,
        };

        Some(Self { channel, login })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YouTubeCredentials {
    pub api_key: String,
    pub channel_id: String,
}

impl YouTubeCredentials {
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Some(Self {
            api_key: required(&lookup, YOUTUBE_API_KEY)?,
            channel_id: required(&lookup, YOUTUBE_CHANNEL_ID)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TikTokCredentials {
    pub username: String,
    /// Overrides the configured relay URL
    pub relay_url: Option<String>,
}

impl TikTokCredentials {
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = required(&lookup, TIKTOK_USERNAME)?
            .trim_start_matches('@')
            .to_string();
        if username.is_empty() {
            return None;
        }

        Some(Self {
            username,
            relay_url: required(&lookup, TIKTOK_RELAY_URL),
        })
    }
}
