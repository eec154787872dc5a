//! Configuration management

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use multichat_adapters::youtube::{YouTubeSettings, DEFAULT_API_BASE_URL};
use multichat_adapters::tiktok::DEFAULT_RELAY_URL;
use multichat_broadcaster::{BroadcasterConfig, WireFormat};
use serde::{Deserialize, Serialize};

/// Which adapters the daemon may start (credentials still required)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformToggles {
    pub twitch: bool,
    pub youtube: bool,
    pub tiktok: bool,
}

impl Default for PlatformToggles {
    fn default() -> Self {
        Self {
            twitch: true,
            youtube: true,
            tiktok: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitchConfig {
    pub reconnect_delay_secs: u64,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    /// Seconds between live-stream probes while offline
    pub search_interval_secs: u64,
    /// Poll delay when the API does not suggest one
    pub default_poll_interval_ms: u64,
    /// Pause after a failed poll
    pub backoff_secs: u64,
    pub api_base_url: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            search_interval_secs: 15,
            default_poll_interval_ms: 5000,
            backoff_secs: 10,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TikTokConfig {
    /// Webcast relay; `{username}` is replaced with the streamer
    pub relay_url: String,
    pub reconnect_delay_secs: u64,
}

impl Default for TikTokConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            reconnect_delay_secs: 5,
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultichatConfig {
    /// Path to configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Address the viewer WebSocket server binds
    pub bind_address: SocketAddr,

    /// Frame shape written to viewers
    pub wire_format: WireFormat,

    /// Per-viewer outbound queue length before the viewer is evicted
    pub client_queue_capacity: usize,

    /// Recent frames replayed to a new viewer (0 disables)
    pub catch_up_len: usize,

    pub platforms: PlatformToggles,
    pub twitch: TwitchConfig,
    pub youtube: YouTubeConfig,
    pub tiktok: TikTokConfig,
}

impl Default for MultichatConfig {
    fn default() -> Self {
        let broadcaster = BroadcasterConfig::default();
        Self {
            config_path: PathBuf::new(),
            bind_address: broadcaster.bind_address,
            wire_format: broadcaster.wire_format,
            client_queue_capacity: broadcaster.client_queue_capacity,
            catch_up_len: broadcaster.catch_up_len,
            platforms: PlatformToggles::default(),
            twitch: TwitchConfig::default(),
            youtube: YouTubeConfig::default(),
            tiktok: TikTokConfig::default(),
        }
    }
}

impl MultichatConfig {
    /// Load from the default location, writing a default file if missing
    pub fn load() -> Result<Self> {
        let path = multichat_paths::config_file_path()
            .context("Failed to resolve config file location")?;
        Self::load_from(&path)
    }

    /// Load configuration from `path`, or create a default file there
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;

            let mut config: MultichatConfig = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;

            config.config_path = path.to_path_buf();
            Ok(config)
        } else {
            let config = Self {
                config_path: path.to_path_buf(),
                ..Self::default()
            };
            config.save().context("Failed to save default config")?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            multichat_paths::ensure_dir(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&self.config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    pub fn broadcaster_config(&self) -> BroadcasterConfig {
        BroadcasterConfig {
            bind_address: self.bind_address,
            wire_format: self.wire_format,
            client_queue_capacity: self.client_queue_capacity,
            catch_up_len: self.catch_up_len,
        }
    }

    pub fn youtube_settings(&self) -> YouTubeSettings {
        YouTubeSettings {
            search_interval: Duration::from_secs(self.youtube.search_interval_secs),
            default_poll_interval: Duration::from_millis(self.youtube.default_poll_interval_ms),
            backoff: Duration::from_secs(self.youtube.backoff_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = MultichatConfig::default();
        assert_eq!(config.bind_address, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.wire_format, WireFormat::Envelope);
        assert_eq!(config.catch_up_len, 20);
        assert!(config.platforms.twitch);
        assert!(config.platforms.youtube);
        assert!(!config.platforms.tiktok);
        assert_eq!(config.youtube_settings().search_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_missing_file_writes_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = MultichatConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.config_path, path);

        let reloaded = MultichatConfig::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
bind_address = "0.0.0.0:9001"
wire_format = "simple"

[platforms]
tiktok = true

[youtube]
backoff_secs = 30
"#,
        )
        .unwrap();

        let config = MultichatConfig::load_from(&path).unwrap();
        assert_eq!(config.bind_address.port(), 9001);
        assert_eq!(config.wire_format, WireFormat::Simple);
        assert!(config.platforms.tiktok);
        assert!(config.platforms.twitch);
        assert_eq!(config.youtube.backoff_secs, 30);
        assert_eq!(config.youtube.search_interval_secs, 15);
        assert_eq!(config.tiktok.relay_url, DEFAULT_RELAY_URL);
        assert_eq!(config.broadcaster_config().wire_format, WireFormat::Simple);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "bind_address = 42").unwrap();

        assert!(MultichatConfig::load_from(&path).is_err());
    }
}
