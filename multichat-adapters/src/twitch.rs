//! Twitch chat via IRC (`twitch-irc`)

use std::time::Duration;

use multichat_broadcaster::{Emote, Platform};
use twitch_irc::login::StaticLoginCredentials;
use twitch_irc::message::{ServerMessage, UserNoticeEvent};
use twitch_irc::{ClientConfig, SecureTCPTransport, TwitchIRCClient};

use crate::credentials::TwitchCredentials;
use crate::error::{AdapterError, Result};
use crate::raw::{ControlEvent, RawEvent, TwitchEvent};
use crate::sink::EventSink;

/// Reconnect delay after the chat connection ends
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

const EMOTE_CDN: &str = "https://static-cdn.jtvnw.net/emoticons/v2";

/// Tags present on the ROOMSTATE sent after a join. Setting changes arrive
/// as ROOMSTATEs carrying only the changed tag.
const ROOM_SETTINGS: [&str; 5] = ["emote-only", "followers-only", "r9k", "slow", "subs-only"];

pub struct TwitchAdapter {
    credentials: TwitchCredentials,
    reconnect_delay: Duration,
}

impl TwitchAdapter {
    pub fn new(credentials: TwitchCredentials, reconnect_delay: Duration) -> Self {
        Self {
            credentials,
            reconnect_delay,
        }
    }

    /// Read chat until the pipeline goes away, reconnecting on a fixed delay
    pub async fn run(self, sink: EventSink) {
        loop {
            match self.session(&sink).await {
                Ok(()) => {
                    tracing::warn!("[TWITCH] Disconnected from #{}", self.credentials.channel);
                    let _ = sink
                        .emit(RawEvent::Control(ControlEvent::Disconnected {
                            platform: Platform::Twitch,
                            reason: "connection closed".to_string(),
                        }))
                        .await;
                }
                Err(AdapterError::SinkClosed) => return,
                Err(e) => {
                    tracing::error!("[TWITCH] Connection failed: {}", e);
                    let _ = sink
                        .emit(RawEvent::Control(ControlEvent::ConnectFailed {
                            platform: Platform::Twitch,
                            reason: e.to_string(),
                        }))
                        .await;
                }
            }

            if sink.is_closed() {
                return;
            }
            tracing::info!(
                "[TWITCH] Reconnecting in {} seconds...",
                self.reconnect_delay.as_secs()
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// One client lifetime. `twitch-irc` reconnects and rejoins on its own,
    /// so `Connected` is emitted on every join rather than once. The session
    /// only ends when the message stream does or the join is rejected.
    async fn session(&self, sink: &EventSink) -> Result<()> {
        let config = match &self.credentials.login {
            Some(login) => ClientConfig::new_simple(StaticLoginCredentials::new(
                login.username.clone(),
                Some(login.oauth_token.clone()),
            )),
            None => ClientConfig::default(),
        };

        let (mut incoming, client) =
            TwitchIRCClient::<SecureTCPTransport, StaticLoginCredentials>::new(config);

        let channel = self.credentials.channel.clone();
        client
            .join(channel.clone())
            .map_err(|e| AdapterError::InvalidChannel(e.to_string()))?;

        while let Some(message) = incoming.recv().await {
            if is_channel_join(&message) {
                tracing::info!("[TWITCH] Successfully connected and listening to #{}", channel);
                sink.emit(RawEvent::Control(ControlEvent::Connected {
                    platform: Platform::Twitch,
                    target: format!("#{}", channel),
                }))
                .await?;
                continue;
            }

            if let ServerMessage::Notice(notice) = &message {
                tracing::warn!("[TWITCH] Notice: {}", notice.message_text);
            }

            if let Some(event) = convert(message) {
                sink.emit(RawEvent::Twitch(event)).await?;
            }
        }

        Ok(())
    }
}

/// Whether `message` is the room state Twitch sends right after a join
pub fn is_channel_join(message: &ServerMessage) -> bool {
    match message {
        ServerMessage::RoomState(state) => ROOM_SETTINGS
            .iter()
            .all(|tag| state.source.tags.0.contains_key(*tag)),
        _ => false,
    }
}

/// Lift the IRC messages we display into `TwitchEvent`s
pub fn convert(message: ServerMessage) -> Option<TwitchEvent> {
    match message {
        ServerMessage::Privmsg(msg) => {
            let reward_id = msg
                .source
                .tags
                .0
                .get("custom-reward-id")
                .and_then(|v: &Option<String>| v.clone());

            Some(TwitchEvent::Message {
                user_id: Some(msg.sender.id),
                display_name: msg.sender.name,
                color: msg
                    .name_color
                    .map(|c| format!("#{:02X}{:02X}{:02X}", c.r, c.g, c.b)),
                text: msg.message_text,
                is_action: msg.is_action,
                emotes: msg
                    .emotes
                    .iter()
                    .filter_map(|e| emote_from_range(&e.id, &e.code, e.char_range.clone()))
                    .collect(),
                bits: msg.bits,
                reward_id,
            })
        }
        ServerMessage::UserNotice(msg) => {
            let user = msg.sender.name;
            match msg.event {
                UserNoticeEvent::SubOrResub {
                    is_resub,
                    cumulative_months,
                    sub_plan,
                    ..
                } => {
                    if is_resub {
                        Some(TwitchEvent::Resubscription {
                            user,
                            months: cumulative_months,
                        })
                    } else {
                        Some(TwitchEvent::Subscription {
                            user,
                            plan: sub_plan,
                        })
                    }
                }
                UserNoticeEvent::Raid { viewer_count, .. } => {
                    Some(TwitchEvent::Raid { user, viewer_count })
                }
                UserNoticeEvent::Ritual { ritual_name } => {
                    Some(TwitchEvent::Ritual { user, ritual_name })
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Twitch reports half-open character ranges; `Emote` wants an inclusive end
pub fn emote_from_range(id: &str, code: &str, range: std::ops::Range<usize>) -> Option<Emote> {
    if range.end <= range.start {
        return None;
    }
    Some(Emote {
        name: code.to_string(),
        image_url: format!("{}/{}/default/dark/1.0", EMOTE_CDN, id),
        start_index: range.start,
        end_index: range.end - 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use twitch_irc::message::IRCMessage;

    fn parse(line: &str) -> ServerMessage {
        let irc = IRCMessage::parse(line).unwrap();
        ServerMessage::try_from(irc).unwrap()
    }

    #[test]
    fn test_emote_range_conversion() {
        let emote = emote_from_range("25", "Kappa", 0..5).unwrap();
        assert_eq!(emote.start_index, 0);
        assert_eq!(emote.end_index, 4);
        assert_eq!(
            emote.image_url,
            "https://static-cdn.jtvnw.net/emoticons/v2/25/default/dark/1.0"
        );
        assert!(emote_from_range("25", "Kappa", 3..3).is_none());
    }

    #[test]
    fn test_convert_privmsg() {
        let message = parse(
            "@badge-info=;badges=;color=#0000FF;display-name=JuN1oRRRR;emotes=25:5-9;flags=;\
             id=e9d998c3-36f1-430f-89ec-6b887c28af36;mod=0;room-id=11148817;subscriber=0;\
             tmi-sent-ts=1594545155039;turbo=0;user-id=29803735;user-type= \
             :jun1orrrr!jun1orrrr@jun1orrrr.tmi.twitch.tv PRIVMSG #pajlada :dank Kappa",
        );

        match convert(message) {
            Some(TwitchEvent::Message {
                user_id,
                display_name,
                color,
                text,
                is_action,
                emotes,
                bits,
                reward_id,
            }) => {
                assert_eq!(user_id.as_deref(), Some("29803735"));
                assert_eq!(display_name, "JuN1oRRRR");
                assert_eq!(color.as_deref(), Some("#0000FF"));
                assert_eq!(text, "dank Kappa");
                assert!(!is_action);
                assert_eq!(emotes.len(), 1);
                assert_eq!(emotes[0].start_index, 5);
                assert_eq!(emotes[0].end_index, 9);
                assert_eq!(bits, None);
                assert_eq!(reward_id, None);
            }
            other => panic!("Unexpected conversion: {:?}", other),
        }
    }

    #[test]
    fn test_join_room_state_detection() {
        let join = parse(
            "@emote-only=0;followers-only=-1;r9k=0;room-id=40286300;slow=0;subs-only=0 \
             :tmi.twitch.tv ROOMSTATE #randers",
        );
        assert!(is_channel_join(&join));

        let slow_mode_change = parse("@room-id=40286300;slow=10 :tmi.twitch.tv ROOMSTATE #randers");
        assert!(!is_channel_join(&slow_mode_change));

        assert!(!is_channel_join(&parse("PING :tmi.twitch.tv")));
    }

    #[test]
    fn test_convert_ignores_other_messages() {
        let ping = parse("PING :tmi.twitch.tv");
        assert!(convert(ping).is_none());
    }
}
