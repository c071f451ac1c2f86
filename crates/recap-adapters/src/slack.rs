use async_trait::async_trait;
use recap_core::{
    ChatChannel, ChatMessage, ChatSource, Notifier, RecapError, Result, SourceKind, TimeWindow,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://slack.com/api";

/// Slack Web API client. Implements both the chat source (history and
/// channel listing) and the notifier (posting summaries back).
pub struct SlackClient {
    http: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

#[derive(Deserialize)]
struct HistoryResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Deserialize)]
struct WireMessage {
    user: Option<String>,
    ts: Option<String>,
    text: Option<String>,
    subtype: Option<String>,
}

#[derive(Deserialize)]
struct ChannelsResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    channels: Vec<WireChannel>,
}

#[derive(Deserialize)]
struct WireChannel {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct PostResponse {
    ok: bool,
    error: Option<String>,
}

impl SlackClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(token: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: crate::http_client(),
            token: token.filter(|t| !t.is_empty()),
            base_url: base_url.into(),
        }
    }

    pub fn configured(&self) -> bool {
        self.token.is_some()
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or(RecapError::unconfigured(SourceKind::Chat))
    }

    fn api_err(status: u16, error: Option<String>) -> RecapError {
        RecapError::api(
            SourceKind::Chat,
            status,
            error.unwrap_or_else(|| "unknown error".to_string()),
        )
    }
}

fn to_message(wire: WireMessage) -> ChatMessage {
    ChatMessage {
        user: wire.user,
        timestamp: wire.ts.unwrap_or_default(),
        text: wire.text.unwrap_or_default(),
    }
}

/// Messages the platform itself generates on behalf of apps.
fn is_bot_message(wire: &WireMessage) -> bool {
    wire.subtype.as_deref() == Some("bot_message")
}

#[async_trait]
impl ChatSource for SlackClient {
    async fn fetch_messages(
        &self,
        channel_id: &str,
        window: TimeWindow,
    ) -> Result<Vec<ChatMessage>> {
        let token = match self.token() {
            Ok(t) => t,
            Err(err) => {
                warn!("chat credentials missing, returning no messages: {}", err);
                return Ok(Vec::new());
            }
        };

        let oldest = window.since().timestamp().to_string();
        let response = self
            .http
            .get(format!("{}/conversations.history", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("channel", channel_id),
                ("oldest", oldest.as_str()),
                ("limit", "200"),
            ])
            .send()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Chat, e.to_string()))?;

        let status = response.status().as_u16();
        let body: HistoryResponse = response
            .json()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Chat, e.to_string()))?;

        if !body.ok {
            return Err(Self::api_err(status, body.error));
        }

        Ok(body
            .messages
            .into_iter()
            .filter(|m| !is_bot_message(m))
            .map(to_message)
            .collect())
    }

    async fn list_channels(&self) -> Result<Vec<ChatChannel>> {
        let token = match self.token() {
            Ok(t) => t,
            Err(err) => {
                warn!("chat credentials missing, returning no channels: {}", err);
                return Ok(Vec::new());
            }
        };

        let response = self
            .http
            .get(format!("{}/conversations.list", self.base_url))
            .bearer_auth(token)
            .query(&[("types", "public_channel,private_channel")])
            .send()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Chat, e.to_string()))?;

        let status = response.status().as_u16();
        let body: ChannelsResponse = response
            .json()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Chat, e.to_string()))?;

        if !body.ok {
            return Err(Self::api_err(status, body.error));
        }

        Ok(body
            .channels
            .into_iter()
            .map(|c| ChatChannel {
                id: c.id,
                name: c.name,
            })
            .collect())
    }
}

#[async_trait]
impl Notifier for SlackClient {
    async fn post_message(&self, channel_id: &str, text: &str) -> Result<bool> {
        let token = self.token()?;

        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(token)
            .json(&json!({
                "channel": channel_id,
                "text": text,
                "unfurl_links": false,
            }))
            .send()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Chat, e.to_string()))?;

        let status = response.status().as_u16();
        let body: PostResponse = response
            .json()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Chat, e.to_string()))?;

        if !body.ok {
            return Err(Self::api_err(status, body.error));
        }
        Ok(true)
    }
}
