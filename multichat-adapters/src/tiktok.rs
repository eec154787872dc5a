//! TikTok LIVE through a local webcast relay.
//!
//! The relay speaks the webcast protocol upstream and forwards each event as
//! a `{ "event": <name>, "data": {...} }` text frame.

use std::time::Duration;

use futures_util::StreamExt;
use multichat_broadcaster::Platform;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::credentials::TikTokCredentials;
use crate::error::{AdapterError, Result};
use crate::raw::{ControlEvent, RawEvent, TikTokEvent};
use crate::sink::EventSink;

pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:21213/";

/// Reconnect delay after the relay connection ends
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct TikTokAdapter {
    username: String,
    relay_url: String,
    reconnect_delay: Duration,
}

impl TikTokAdapter {
    /// `relay_url` is used unless the credentials carry an override.
    /// A `{username}` placeholder in the URL is replaced with the streamer.
    pub fn new(credentials: TikTokCredentials, relay_url: &str, reconnect_delay: Duration) -> Self {
        let template = credentials.relay_url.as_deref().unwrap_or(relay_url);
        Self {
            relay_url: template.replace("{username}", &credentials.username),
            username: credentials.username,
            reconnect_delay,
        }
    }

    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    pub async fn run(self, sink: EventSink) {
        loop {
            match self.session(&sink).await {
                Ok(()) => {
                    tracing::warn!("[TIKTOK] Disconnected from @{}", self.username);
                    let _ = sink
                        .emit(RawEvent::Control(ControlEvent::Disconnected {
                            platform: Platform::TikTok,
                            reason: "relay closed".to_string(),
                        }))
                        .await;
                }
                Err(AdapterError::SinkClosed) => return,
                Err(e) => {
                    tracing::error!("[TIKTOK] Failed to connect: {}", e);
                    let _ = sink
                        .emit(RawEvent::Control(ControlEvent::ConnectFailed {
                            platform: Platform::TikTok,
                            reason: e.to_string(),
                        }))
                        .await;
                }
            }

            if sink.is_closed() {
                return;
            }
            tracing::info!(
                "[TIKTOK] Reconnecting in {} seconds...",
                self.reconnect_delay.as_secs()
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn session(&self, sink: &EventSink) -> Result<()> {
        let (stream, _) = connect_async(self.relay_url.as_str()).await?;
        let (_write, mut read) = stream.split();

        tracing::info!("[TIKTOK] Successfully connected to @{}'s live", self.username);
        sink.emit(RawEvent::Control(ControlEvent::Connected {
            platform: Platform::TikTok,
            target: format!("@{}", self.username),
        }))
        .await?;

        while let Some(message) = read.next().await {
            match message? {
                Message::Text(text) => match TikTokEvent::from_relay_frame(&text) {
                    Some(event) => sink.emit(RawEvent::TikTok(event)).await?,
                    None => tracing::debug!("[TIKTOK] Ignoring relay frame: {}", text),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }

        Ok(())
    }
}
