//! Reconnecting viewer that feeds a `DisplayBuffer`

use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::buffer::{DisplayBuffer, DisplayEntry};
use crate::error::Result;
use crate::frame::decode_frame;

/// Default broadcaster address
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8080/";

/// Reconnection delay after the viewer socket closes or fails
pub const RECONNECT_DELAY_SECS: u64 = 5;

/// What the view renders, published after every change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplaySnapshot {
    pub connected: bool,
    /// Total entries received since the client was created. Keeps counting
    /// across reconnects even though the window is reset.
    pub received: u64,
    /// Current window, oldest first
    pub entries: Vec<DisplayEntry>,
}

impl DisplaySnapshot {
    /// Entries that arrived after a snapshot that had seen `previous` entries
    pub fn new_since(&self, previous: u64) -> &[DisplayEntry] {
        let fresh = self.received.saturating_sub(previous) as usize;
        let skip = self.entries.len().saturating_sub(fresh);
        &self.entries[skip..]
    }
}

pub struct DisplayClient {
    url: String,
    reconnect_delay: Duration,
    buffer: DisplayBuffer,
    received: u64,
    connected: bool,
    render: watch::Sender<DisplaySnapshot>,
}

impl DisplayClient {
    /// Create a client and the render signal it publishes to
    pub fn new(url: impl Into<String>) -> (Self, watch::Receiver<DisplaySnapshot>) {
        let (render, rx) = watch::channel(DisplaySnapshot::default());
        let client = Self {
            url: url.into(),
            reconnect_delay: Duration::from_secs(RECONNECT_DELAY_SECS),
            buffer: DisplayBuffer::new(),
            received: 0,
            connected: false,
            render,
        };
        (client, rx)
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn buffer(&self) -> &DisplayBuffer {
        &self.buffer
    }

    /// Decode one text frame into the buffer.
    ///
    /// Returns whether the window changed; undecodable frames are logged and
    /// skipped.
    pub fn handle_frame(&mut self, text: &str) -> bool {
        match decode_frame(text) {
            Ok(Some(event)) => {
                self.buffer.push(event);
                self.received += 1;
                self.publish();
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Failed to parse frame: {} (frame: {})", e, text);
                false
            }
        }
    }

    /// Runs until every render receiver has been dropped
    pub async fn run(mut self) {
        loop {
            match self.connect_and_process().await {
                Ok(()) => info!("Viewer connection closed"),
                Err(e) => error!("Viewer connection error: {}", e),
            }
            self.set_connected(false);

            if self.render.is_closed() {
                debug!("No renderer left, stopping viewer");
                return;
            }

            warn!(
                "Disconnected from {}, retrying in {} seconds...",
                self.url,
                self.reconnect_delay.as_secs()
            );
            sleep(self.reconnect_delay).await;
        }
    }

    async fn connect_and_process(&mut self) -> Result<()> {
        let (stream, _) = connect_async(self.url.as_str()).await?;
        info!("✓ Connected to {}", self.url);

        // The server replays its catch-up window on every connect
        self.buffer.clear();
        self.connected = true;
        self.publish();

        let (_write, mut read) = stream.split();
        while let Some(message) = read.next().await {
            match message? {
                Message::Text(text) => {
                    self.handle_frame(&text);
                }
                Message::Close(_) => break,
                _ => {}
            }
            if self.render.is_closed() {
                break;
            }
        }

        Ok(())
    }

    fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            self.connected = connected;
            self.publish();
        }
    }

    fn publish(&self) {
        self.render.send_replace(DisplaySnapshot {
            connected: self.connected,
            received: self.received,
            entries: self.buffer.snapshot(),
        });
    }
}
