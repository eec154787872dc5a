//! The single entry point between adapters and the broadcaster

use std::sync::Arc;

use multichat_broadcaster::Broadcaster;
use tokio::sync::mpsc;

use crate::error::{AdapterError, Result};
use crate::normalizer::Normalizer;
use crate::raw::RawEvent;

/// Channel capacity for raw events (adapters -> pipeline)
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Cloneable handle adapters use to report raw events
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::Sender<RawEvent>,
}

impl EventSink {
    /// Create a sink and the receiver the pipeline drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RawEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub async fn emit(&self, raw: RawEvent) -> Result<()> {
        self.tx.send(raw).await.map_err(|_| AdapterError::SinkClosed)
    }

    /// `onMessage(platform, user, message, isAction)`
    pub async fn on_message(
        &self,
        platform: &str,
        user: &str,
        message: &str,
        is_action: bool,
    ) -> Result<()> {
        self.emit(RawEvent::Simple {
            platform: platform.to_string(),
            user: user.to_string(),
            message: message.to_string(),
            is_action,
        })
        .await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Normalize raw events in arrival order and publish each one.
///
/// Runs until every `EventSink` clone has been dropped.
pub async fn run_pipeline(mut rx: mpsc::Receiver<RawEvent>, broadcaster: Arc<Broadcaster>) {
    let mut normalizer = Normalizer::new();

    while let Some(raw) = rx.recv().await {
        let hint = raw.platform_hint();
        match normalizer.normalize(raw) {
            Some(event) => {
                tracing::info!("{}", event);
                broadcaster.publish(&event).await;
            }
            None => {
                tracing::debug!("Raw event from {:?} produced no chat event", hint);
            }
        }
    }

    tracing::info!("Event pipeline stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{ControlEvent, TwitchEvent};
    use multichat_broadcaster::{BroadcasterConfig, Connection, Platform, WireFormat};
    use std::net::SocketAddr;
    use tokio_test::assert_ok;

    fn broadcaster() -> Arc<Broadcaster> {
        Arc::new(Broadcaster::new(BroadcasterConfig {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
            wire_format: WireFormat::Simple,
            client_queue_capacity: 32,
            catch_up_len: 0,
        }))
    }

    #[tokio::test]
    async fn test_pipeline_preserves_order_and_drops_control_noise() {
        let broadcaster = broadcaster();
        let (viewer, mut frames) = Connection::new("viewer", 32);
        broadcaster.attach(viewer).await;

        let (sink, rx) = EventSink::channel(16);
        let pipeline = tokio::spawn(run_pipeline(rx, Arc::clone(&broadcaster)));

        assert_ok!(sink.on_message("Twitch", "a", "one", false).await);
        assert_ok!(
            sink.emit(RawEvent::Control(ControlEvent::ConnectFailed {
                platform: Platform::TikTok,
                reason: "offline".to_string(),
            }))
            .await
        );
        assert_ok!(sink.emit(RawEvent::simple("YouTube", "b", "two")).await);
        assert_ok!(
            sink.emit(RawEvent::Twitch(TwitchEvent::Follow {
                user: "c".to_string()
            }))
            .await
        );

        drop(sink);
        pipeline.await.unwrap();

        let mut texts = Vec::new();
        while let Ok(frame) = frames.try_recv() {
            let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
            texts.push(value["message"].as_str().unwrap().to_string());
        }
        assert_eq!(texts, vec!["one", "two", "just followed!"]);
    }

    #[tokio::test]
    async fn test_emit_after_pipeline_gone() {
        let (sink, rx) = EventSink::channel(4);
        drop(rx);

        assert!(sink.is_closed());
        let err = sink.emit(RawEvent::simple("Twitch", "a", "b")).await;
        assert!(matches!(err, Err(AdapterError::SinkClosed)));
    }
}
