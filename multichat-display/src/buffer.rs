use std::collections::VecDeque;

use multichat_broadcaster::ChatEvent;

use crate::emotes::render_message;

/// Number of messages kept on screen
pub const DISPLAY_CAPACITY: usize = 20;

/// Name color used when the event carries none
pub const DEFAULT_NAME_COLOR: &str = "#FFFFFF";

const TWITCH_ICON: &str = "https://static.twitchcdn.net/assets/favicon-32-e29e246c157142c94346.png";
const YOUTUBE_ICON: &str = "https://www.youtube.com/s/desktop/1b326317/img/favicon_32x32.png";

/// Platform icon by exact match on the lower-cased platform name
pub fn platform_icon(platform: &str) -> Option<&'static str> {
    match platform.to_lowercase().as_str() {
        "twitch" => Some(TWITCH_ICON),
        "youtube" => Some(YOUTUBE_ICON),
        _ => None,
    }
}

/// A rendered event ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayEntry {
    pub event: ChatEvent,
    pub icon_url: Option<&'static str>,
    /// Emote-substituted, HTML-safe message body
    pub html: String,
    pub color: String,
}

impl DisplayEntry {
    pub fn render(event: ChatEvent) -> Self {
        let icon_url = platform_icon(event.platform().as_str());
        let html = render_message(&event.message().text, &event.message().emotes);
        let color = event
            .user()
            .color
            .clone()
            .unwrap_or_else(|| DEFAULT_NAME_COLOR.to_string());

        Self {
            event,
            icon_url,
            html,
            color,
        }
    }
}

/// Bounded window of the most recent entries, oldest first
#[derive(Debug, Clone)]
pub struct DisplayBuffer {
    entries: VecDeque<DisplayEntry>,
    capacity: usize,
}

impl Default for DisplayBuffer {
    fn default() -> Self {
        Self::with_capacity(DISPLAY_CAPACITY)
    }
}

impl DisplayBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Render and append `event`, returning the entry evicted to make room
    pub fn push(&mut self, event: ChatEvent) -> Option<DisplayEntry> {
        self.entries.push_back(DisplayEntry::render(event));
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &DisplayEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&DisplayEntry> {
        self.entries.back()
    }

    pub fn snapshot(&self) -> Vec<DisplayEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
