//! Viewer side of Multichat
//!
//! Decodes broadcaster frames (either wire shape), renders them into a
//! bounded [`DisplayBuffer`] of the 20 most recent entries, and drives a
//! reconnecting [`DisplayClient`] that signals the view after each change.

pub mod buffer;
pub mod client;
pub mod emotes;
pub mod error;
pub mod frame;

// Re-exports
pub use buffer::{platform_icon, DisplayBuffer, DisplayEntry, DEFAULT_NAME_COLOR, DISPLAY_CAPACITY};
pub use client::{DisplayClient, DisplaySnapshot, DEFAULT_SERVER_URL, RECONNECT_DELAY_SECS};
pub use emotes::render_message;
pub use error::{DisplayError, Result};
pub use frame::decode_frame;
