use async_trait::async_trait;
use recap_core::{Prompt, RecapError, Result, SourceKind, Summarizer};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.7;

/// Chat-completion summarization client.
///
/// One best-effort call per request: no retry, no backoff. Failures are
/// rendered into the returned text so callers can always display it.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct WireChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Deserialize)]
struct WireCompletion {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

impl OpenAiClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: crate::http_client(),
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    pub fn configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn request_body(&self, prompt: &Prompt) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user_message()},
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        })
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RecapError::unconfigured(SourceKind::Summarizer))?;

        debug!(model = %self.model, "requesting chat completion");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Summarizer, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RecapError::api(
                SourceKind::Summarizer,
                status.as_u16(),
                message,
            ));
        }

        let body: WireCompletion = response
            .json()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Summarizer, e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content);

        match content {
            Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => Ok("No summary generated.".to_string()),
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiClient {
    async fn summarize(&self, prompt: &Prompt) -> String {
        match self.complete(prompt).await {
            Ok(text) => text,
            Err(err) => {
                error!("summarization failed: {}", err);
                format!("Error generating summary: {}", err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_core::PromptSection;

    fn prompt() -> Prompt {
        Prompt {
            system: "You are a test".into(),
            sections: vec![PromptSection {
                label: "Chat Communications".into(),
                body: "- shipped it".into(),
            }],
        }
    }

    #[test]
    fn request_body_pins_model_parameters() {
        let client = OpenAiClient::new(Some("sk-test".into()), DEFAULT_BASE_URL, DEFAULT_MODEL);
        let body = client.request_body(&prompt());

        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("- shipped it"));
    }

    #[test]
    fn empty_choices_decode_cleanly() {
        let body: WireCompletion = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(body.choices.is_empty());
    }

    #[tokio::test]
    async fn unconfigured_failure_is_rendered_into_text() {
        let client = OpenAiClient::new(None, DEFAULT_BASE_URL, DEFAULT_MODEL);
        let text = client.summarize(&prompt()).await;
        assert!(text.starts_with("Error generating summary:"));
        assert!(text.contains("summarizer"));
    }
}
