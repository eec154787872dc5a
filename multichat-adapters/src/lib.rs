//! Upstream chat sources for Multichat
//!
//! Each adapter wraps one platform connection and reports what it sees as a
//! [`RawEvent`] through an [`EventSink`]. A single pipeline task drains the
//! sink in arrival order, runs the [`Normalizer`] and publishes the resulting
//! `ChatEvent`s to the broadcaster.
//!
//! ```text
//! TwitchAdapter  ─┐
//! YouTubeSession ─┼─> EventSink ─> run_pipeline ─> Normalizer ─> Broadcaster
//! TikTokAdapter  ─┘
//! ```
//!
//! Adapters fail and reconnect independently; none of them can stall the
//! others or the viewers.

pub mod credentials;
pub mod error;
pub mod normalizer;
pub mod raw;
pub mod sink;
pub mod supervisor;
pub mod tiktok;
pub mod twitch;
pub mod youtube;

// Re-exports
pub use credentials::{TikTokCredentials, TwitchCredentials, TwitchLogin, YouTubeCredentials};
pub use error::{AdapterError, Result};
pub use normalizer::{normalize_at, Normalizer, NEUTRAL_COLOR, SYSTEM_USER};
pub use raw::{ControlEvent, RawEvent, TikTokEvent, TwitchEvent};
pub use sink::{run_pipeline, EventSink, EVENT_CHANNEL_CAPACITY};
pub use supervisor::AdapterSupervisor;
pub use tiktok::TikTokAdapter;
pub use twitch::TwitchAdapter;
pub use youtube::{HttpLiveChatApi, LiveChatApi, LiveChatPage, YouTubeSession, YouTubeSettings};
