//! Wiring: broadcaster, event pipeline and the platform adapters

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use multichat_adapters::credentials::{
    TIKTOK_USERNAME, TWITCH_CHANNEL, YOUTUBE_API_KEY, YOUTUBE_CHANNEL_ID,
};
use multichat_adapters::{
    run_pipeline, AdapterSupervisor, EventSink, TikTokAdapter, TikTokCredentials, TwitchAdapter,
    TwitchCredentials, YouTubeCredentials, YouTubeSession, EVENT_CHANNEL_CAPACITY,
};
use multichat_broadcaster::{Broadcaster, Platform};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::MultichatConfig;

/// How long shutdown waits for queued events to drain
const PIPELINE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Spawn every adapter that is enabled and has credentials.
///
/// Returns the platforms that were started. A platform without credentials
/// is skipped with a warning; the others start regardless.
pub fn start_adapters<F>(
    config: &MultichatConfig,
    lookup: F,
    sink: &EventSink,
    supervisor: &mut AdapterSupervisor,
) -> Vec<Platform>
where
    F: Fn(&str) -> Option<String>,
{
    let mut started = Vec::new();

    if !config.platforms.twitch {
        info!("[TWITCH] Disabled in config");
    } else if let Some(credentials) = TwitchCredentials::from_lookup(&lookup) {
        info!("[TWITCH] Attempting to connect to #{}...", credentials.channel);
        let adapter = TwitchAdapter::new(
            credentials,
            Duration::from_secs(config.twitch.reconnect_delay_secs),
        );
        supervisor.start(Platform::Twitch, adapter.run(sink.clone()));
        started.push(Platform::Twitch);
    } else {
        warn!("[TWITCH] Missing {}; skipping connection", TWITCH_CHANNEL);
    }

    if !config.platforms.youtube {
        info!("[YOUTUBE] Disabled in config");
    } else if let Some(credentials) = YouTubeCredentials::from_lookup(&lookup) {
        let session = YouTubeSession::from_credentials(
            &credentials,
            &config.youtube.api_base_url,
            config.youtube_settings(),
        );
        supervisor.start(Platform::YouTube, session.run(sink.clone()));
        started.push(Platform::YouTube);
    } else {
        warn!(
            "[YOUTUBE] Missing {} or {}; skipping connection",
            YOUTUBE_API_KEY, YOUTUBE_CHANNEL_ID
        );
    }

    if !config.platforms.tiktok {
        info!("[TIKTOK] Disabled in config");
    } else if let Some(credentials) = TikTokCredentials::from_lookup(&lookup) {
        let adapter = TikTokAdapter::new(
            credentials,
            &config.tiktok.relay_url,
            Duration::from_secs(config.tiktok.reconnect_delay_secs),
        );
        info!("[TIKTOK] Connecting through relay {}", adapter.relay_url());
        supervisor.start(Platform::TikTok, adapter.run(sink.clone()));
        started.push(Platform::TikTok);
    } else {
        warn!("[TIKTOK] Missing {}; skipping connection", TIKTOK_USERNAME);
    }

    started
}

/// A running Multichat instance
pub struct Daemon {
    broadcaster: Arc<Broadcaster>,
    supervisor: AdapterSupervisor,
    sink: EventSink,
    pipeline: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl Daemon {
    /// Start the viewer server, the event pipeline and the adapters that
    /// `lookup` has credentials for
    pub async fn start<F>(config: &MultichatConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let broadcaster = Arc::new(Broadcaster::new(config.broadcaster_config()));
        let local_addr = broadcaster
            .start()
            .await
            .with_context(|| format!("Failed to start broadcaster on {}", config.bind_address))?;

        let (sink, rx) = EventSink::channel(EVENT_CHANNEL_CAPACITY);
        let pipeline = tokio::spawn(run_pipeline(rx, Arc::clone(&broadcaster)));

        let mut supervisor = AdapterSupervisor::new();
        let started = start_adapters(config, lookup, &sink, &mut supervisor);
        if started.is_empty() {
            warn!("No chat platforms connected; viewers will only see injected events");
        }

        Ok(Self {
            broadcaster,
            supervisor,
            sink,
            pipeline,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Handle for reporting events directly into the pipeline
    pub fn sink(&self) -> EventSink {
        self.sink.clone()
    }

    pub fn adapters(&self) -> Vec<Platform> {
        self.supervisor.platforms()
    }

    /// Stop adapters, drain the pipeline and close every viewer
    pub async fn shutdown(self) -> Result<()> {
        let Self {
            broadcaster,
            mut supervisor,
            sink,
            mut pipeline,
            ..
        } = self;

        supervisor.stop_all();
        drop(supervisor);
        drop(sink);

        if tokio::time::timeout(PIPELINE_DRAIN_TIMEOUT, &mut pipeline)
            .await
            .is_err()
        {
            warn!("Event pipeline did not drain in time");
            pipeline.abort();
        }

        broadcaster
            .stop()
            .await
            .context("Failed to stop broadcaster")?;
        Ok(())
    }
}
