//! Chat event fan-out for Multichat viewers
//!
//! This crate owns the canonical [`ChatEvent`] shape and the WebSocket server
//! that pushes those events to every connected overlay. Each viewer gets its
//! own bounded outbound queue; a viewer that falls behind or drops its socket
//! is evicted without affecting anyone else.
//!
//! # Features
//!
//! - WebSocket server (default `ws://127.0.0.1:8080`)
//! - Server-to-client JSON text frames, encoded once per event
//! - Two wire shapes: the `MultiChat` envelope and the flat simple frame
//! - Snapshot-consistent connection registry
//! - New viewer catch-up (most recent frames, RAM only)
//!
//! # Example Usage
//!
//! ```no_run
//! use chrono::Utc;
//! use multichat_broadcaster::{
//!     Broadcaster, BroadcasterConfig, ChatEvent, EventKind, MessageContent, Platform,
//!     UserIdentity,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broadcaster = Broadcaster::new(BroadcasterConfig::default());
//!     broadcaster.start().await?;
//!
//!     let event = ChatEvent::new(
//!         Platform::Twitch,
//!         EventKind::Chat,
//!         UserIdentity::named("alice"),
//!         MessageContent::plain("hello chat"),
//!         Utc::now(),
//!     );
//!     let report = broadcaster.publish(&event).await;
//!     println!("delivered to {} viewers", report.delivered);
//!
//!     broadcaster.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcaster;
pub mod error;
pub mod events;
pub mod registry;
mod server;

// Re-exports
pub use broadcaster::{Broadcaster, BroadcasterConfig, PublishReport};
pub use error::{BroadcasterError, Result};
pub use events::{
    ChatEvent, Emote, EventKind, MessageContent, Platform, UserIdentity, WireFormat,
    ENVELOPE_EVENT,
};
pub use registry::{Connection, ConnectionRegistry, ConnectionState, Frame};
