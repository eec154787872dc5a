//! YouTube live chat over the Data API v3.
//!
//! The session is a small state machine driven by [`YouTubeSession::step`]:
//! `Searching` probes the channel for an active broadcast, `Polling` pages
//! through its live chat, and a failed poll drops into `Backoff` before the
//! next search.

use std::future::Future;
use std::time::Duration;

use multichat_broadcaster::Platform;
use serde::Deserialize;
use serde_json::Value;

use crate::credentials::YouTubeCredentials;
use crate::error::{AdapterError, Result};
use crate::raw::{ControlEvent, RawEvent};
use crate::sink::EventSink;

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// One page of `liveChat/messages`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveChatPage {
    pub items: Vec<Value>,
    pub next_page_token: Option<String>,
    pub polling_interval_millis: Option<u64>,
}

/// The two Data API calls the session needs
pub trait LiveChatApi: Send + Sync {
    /// Resolve the channel's active live chat id, `None` when it is not live
    fn find_live_chat(
        &self,
        channel_id: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    fn fetch_messages(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> impl Future<Output = Result<LiveChatPage>> + Send;
}

pub struct HttpLiveChatApi {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl HttpLiveChatApi {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

impl LiveChatApi for HttpLiveChatApi {
    async fn find_live_chat(&self, channel_id: &str) -> Result<Option<String>> {
        let search = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("channelId", channel_id),
                    ("eventType", "live"),
                    ("type", "video"),
                ],
            )
            .await?;

        let Some(video_id) = search["items"][0]["id"]["videoId"].as_str() else {
            return Ok(None);
        };

        let videos = self
            .get_json(
                "videos",
                &[("part", "liveStreamingDetails"), ("id", video_id)],
            )
            .await?;

        match videos["items"][0]["liveStreamingDetails"]["activeLiveChatId"].as_str() {
            Some(id) => Ok(Some(id.to_string())),
            None => Err(AdapterError::UnexpectedResponse(format!(
                "video {} has no activeLiveChatId",
                video_id
            ))),
        }
    }

    async fn fetch_messages(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<LiveChatPage> {
        let mut query = vec![
            ("part", "snippet,authorDetails"),
            ("liveChatId", live_chat_id),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let value = self.get_json("liveChat/messages", &query).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Searching,
    Polling {
        live_chat_id: String,
        page_token: Option<String>,
    },
    Backoff,
}

#[derive(Debug, Clone, Copy)]
pub struct YouTubeSettings {
    /// Delay between live-stream probes
    pub search_interval: Duration,
    /// Poll delay when the API does not suggest one
    pub default_poll_interval: Duration,
    /// Pause after a failed poll before searching again
    pub backoff: Duration,
}

impl Default for YouTubeSettings {
    fn default() -> Self {
        Self {
            search_interval: Duration::from_secs(15),
            default_poll_interval: Duration::from_millis(5000),
            backoff: Duration::from_secs(10),
        }
    }
}

pub struct YouTubeSession<A> {
    api: A,
    channel_id: String,
    settings: YouTubeSettings,
    state: SessionState,
}

impl YouTubeSession<HttpLiveChatApi> {
    pub fn from_credentials(
        credentials: &YouTubeCredentials,
        base_url: &str,
        settings: YouTubeSettings,
    ) -> Self {
        Self::new(
            HttpLiveChatApi::new(credentials.api_key.clone(), base_url),
            credentials.channel_id.clone(),
            settings,
        )
    }
}

impl<A: LiveChatApi> YouTubeSession<A> {
    pub fn new(api: A, channel_id: impl Into<String>, settings: YouTubeSettings) -> Self {
        Self {
            api,
            channel_id: channel_id.into(),
            settings,
            state: SessionState::Searching,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Advance one transition and return how long to wait before the next.
    ///
    /// Only a closed sink is an error; API failures are absorbed into the
    /// state machine.
    pub async fn step(&mut self, sink: &EventSink) -> Result<Duration> {
        match std::mem::replace(&mut self.state, SessionState::Searching) {
            SessionState::Searching => match self.api.find_live_chat(&self.channel_id).await {
                Ok(Some(live_chat_id)) => {
                    tracing::info!("[YOUTUBE] Found live chat! ID: {}", live_chat_id);
                    sink.emit(RawEvent::Control(ControlEvent::Connected {
                        platform: Platform::YouTube,
                        target: format!("YouTube live chat {}", live_chat_id),
                    }))
                    .await?;
                    self.state = SessionState::Polling {
                        live_chat_id,
                        page_token: None,
                    };
                    Ok(Duration::ZERO)
                }
                Ok(None) => {
                    tracing::info!(
                        "[YOUTUBE] No active live stream found for channel {}. Retrying...",
                        self.channel_id
                    );
                    Ok(self.settings.search_interval)
                }
                Err(e) => {
                    tracing::error!("[YOUTUBE] Error fetching live chat ID: {}", e);
                    Ok(self.settings.search_interval)
                }
            },
            SessionState::Polling {
                live_chat_id,
                page_token,
            } => match self
                .api
                .fetch_messages(&live_chat_id, page_token.as_deref())
                .await
            {
                Ok(page) => {
                    for item in page.items {
                        sink.emit(RawEvent::YouTube(item)).await?;
                    }
                    let delay = page
                        .polling_interval_millis
                        .map(Duration::from_millis)
                        .unwrap_or(self.settings.default_poll_interval);
                    self.state = SessionState::Polling {
                        live_chat_id,
                        page_token: page.next_page_token.or(page_token),
                    };
                    Ok(delay)
                }
                Err(e) => {
                    tracing::error!("[YOUTUBE] Error polling chat messages: {}", e);
                    sink.emit(RawEvent::Control(ControlEvent::Disconnected {
                        platform: Platform::YouTube,
                        reason: e.to_string(),
                    }))
                    .await?;
                    self.state = SessionState::Backoff;
                    Ok(self.settings.backoff)
                }
            },
            SessionState::Backoff => Ok(Duration::ZERO),
        }
    }

    /// Step forever until the pipeline goes away
    pub async fn run(mut self, sink: EventSink) {
        tracing::info!("[YOUTUBE] Attempting to connect...");
        loop {
            match self.step(&sink).await {
                Ok(delay) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    tracing::debug!("[YOUTUBE] Session ended: {}", e);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct ScriptedApi {
        searches: Mutex<VecDeque<Result<Option<String>>>>,
        pages: Mutex<VecDeque<Result<LiveChatPage>>>,
        tokens_seen: Mutex<Vec<Option<String>>>,
    }

    impl LiveChatApi for ScriptedApi {
        async fn find_live_chat(&self, _channel_id: &str) -> Result<Option<String>> {
            self.searches.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }

        async fn fetch_messages(
            &self,
            _live_chat_id: &str,
            page_token: Option<&str>,
        ) -> Result<LiveChatPage> {
            self.tokens_seen
                .lock()
                .unwrap()
                .push(page_token.map(str::to_string));
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(LiveChatPage::default()))
        }
    }

    fn text_item(user: &str, text: &str) -> Value {
        json!({
            "snippet": { "type": "textMessageEvent", "displayMessage": text },
            "authorDetails": { "displayName": user }
        })
    }

    fn drain(rx: &mut mpsc::Receiver<RawEvent>) -> Vec<RawEvent> {
        let mut out = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            out.push(raw);
        }
        out
    }

    #[tokio::test]
    async fn test_search_retries_until_live() {
        let api = ScriptedApi::default();
        api.searches.lock().unwrap().extend([
            Ok(None),
            Err(AdapterError::UnexpectedResponse("quota".to_string())),
            Ok(Some("chat-1".to_string())),
        ]);
        let settings = YouTubeSettings::default();
        let mut session = YouTubeSession::new(api, "UC1", settings);
        let (sink, mut rx) = EventSink::channel(16);

        assert_eq!(session.step(&sink).await.unwrap(), settings.search_interval);
        assert_eq!(session.state(), &SessionState::Searching);
        assert_eq!(session.step(&sink).await.unwrap(), settings.search_interval);
        assert_eq!(session.state(), &SessionState::Searching);
        assert!(drain(&mut rx).is_empty());

        assert_eq!(session.step(&sink).await.unwrap(), Duration::ZERO);
        assert_eq!(
            session.state(),
            &SessionState::Polling {
                live_chat_id: "chat-1".to_string(),
                page_token: None
            }
        );
        let events = drain(&mut rx);
        assert!(matches!(
            events.as_slice(),
            [RawEvent::Control(ControlEvent::Connected { platform: Platform::YouTube, .. })]
        ));
    }

    #[tokio::test]
    async fn test_polling_follows_page_tokens_and_interval() {
        let api = ScriptedApi::default();
        api.searches
            .lock()
            .unwrap()
            .push_back(Ok(Some("chat-1".to_string())));
        api.pages.lock().unwrap().extend([
            Ok(LiveChatPage {
                items: vec![text_item("a", "one"), text_item("b", "two")],
                next_page_token: Some("p2".to_string()),
                polling_interval_millis: Some(2000),
            }),
            Ok(LiveChatPage {
                items: vec![text_item("c", "three")],
                next_page_token: None,
                polling_interval_millis: None,
            }),
        ]);
        let settings = YouTubeSettings::default();
        let mut session = YouTubeSession::new(api, "UC1", settings);
        let (sink, mut rx) = EventSink::channel(16);

        session.step(&sink).await.unwrap();
        drain(&mut rx);

        assert_eq!(
            session.step(&sink).await.unwrap(),
            Duration::from_millis(2000)
        );
        assert_eq!(
            session.step(&sink).await.unwrap(),
            settings.default_poll_interval
        );

        let items: Vec<_> = drain(&mut rx)
            .into_iter()
            .map(|raw| match raw {
                RawEvent::YouTube(v) => v["snippet"]["displayMessage"].as_str().unwrap().to_string(),
                other => panic!("Unexpected raw event: {:?}", other),
            })
            .collect();
        assert_eq!(items, vec!["one", "two", "three"]);
        assert_eq!(
            *session.api.tokens_seen.lock().unwrap(),
            vec![None, Some("p2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_poll_backs_off_then_searches() {
        let api = ScriptedApi::default();
        api.searches
            .lock()
            .unwrap()
            .push_back(Ok(Some("chat-1".to_string())));
        api.pages
            .lock()
            .unwrap()
            .push_back(Err(AdapterError::UnexpectedResponse("ended".to_string())));
        let settings = YouTubeSettings::default();
        let mut session = YouTubeSession::new(api, "UC1", settings);
        let (sink, _rx) = EventSink::channel(16);

        session.step(&sink).await.unwrap();
        assert_eq!(session.step(&sink).await.unwrap(), settings.backoff);
        assert_eq!(session.state(), &SessionState::Backoff);
        assert_eq!(session.step(&sink).await.unwrap(), Duration::ZERO);
        assert_eq!(session.state(), &SessionState::Searching);
    }

    #[tokio::test]
    async fn test_closed_sink_ends_session() {
        let api = ScriptedApi::default();
        api.searches
            .lock()
            .unwrap()
            .push_back(Ok(Some("chat-1".to_string())));
        let mut session = YouTubeSession::new(api, "UC1", YouTubeSettings::default());
        let (sink, rx) = EventSink::channel(4);
        drop(rx);

        assert!(matches!(
            session.step(&sink).await,
            Err(AdapterError::SinkClosed)
        ));
    }

    #[test]
    fn test_page_deserializes_from_api_shape() {
        let page: LiveChatPage = serde_json::from_value(json!({
            "kind": "youtube#liveChatMessageListResponse",
            "nextPageToken": "abc",
            "pollingIntervalMillis": 3000,
            "items": [ { "snippet": { "type": "textMessageEvent" } } ]
        }))
        .unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
        assert_eq!(page.polling_interval_millis, Some(3000));
        assert_eq!(page.items.len(), 1);
    }
}
