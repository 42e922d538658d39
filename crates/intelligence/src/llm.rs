//! Chat-completion client for the analysis call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use repolens_remote::{RemoteClient, RemoteError};
use repolens_state::ApiSettings;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

/// Service name used in error messages.
pub const LLM_SERVICE: &str = "LLM";

const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// A model that answers a conversation with text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier recorded in the analysis metadata.
    fn model(&self) -> &str;

    /// The first reply's text, empty when the reply carried none.
    ///
    /// Errors are reserved for transport and status failures.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RemoteError>;
}

/// Parse a base URL and make sure relative joins keep its path.
pub(crate) fn api_base_url(base: &str) -> Result<Url> {
    let mut normalized = base.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).with_context(|| format!("invalid API base url: {base}"))
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: RemoteClient,
    url: Url,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(client: RemoteClient, base_url: &str, api_key: String, model: String) -> Result<Self> {
        let url = api_base_url(base_url)?
            .join("chat/completions")
            .context("building chat completions url")?;
        Ok(Self {
            client,
            url,
            api_key: api_key.trim().to_string(),
            model,
        })
    }

    /// Build from resolved settings; `None` when no API key is configured.
    pub fn from_settings(client: RemoteClient, settings: &ApiSettings) -> Result<Option<Self>> {
        let Some(api_key) = settings.api_key.clone() else {
            return Ok(None);
        };
        Self::new(client, &settings.base_url, api_key, settings.model.clone()).map(Some)
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RemoteError> {
        let body = ChatBody {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
        };
        let response: Value = self
            .client
            .send_json(LLM_SERVICE, "chat completion", true, |http| {
                http.post(self.url.clone())
                    .bearer_auth(&self.api_key)
                    .json(&body)
            })
            .await?;

        // A reply without content is the model's answer, not a transport failure.
        let text = extract_message_text(&response).unwrap_or_default();
        if text.is_empty() {
            tracing::warn!(
                target: "repolens::analyze",
                model = %self.model,
                "chat reply carried no message content"
            );
        }
        Ok(text)
    }
}

/// First choice's message text; array content parts are concatenated.
fn extract_message_text(val: &Value) -> Option<String> {
    let content = val
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))?;

    if let Some(s) = content.as_str() {
        return Some(s.to_string()).filter(|s| !s.trim().is_empty());
    }
    let buf: String = content
        .as_array()?
        .iter()
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect();
    Some(buf).filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use repolens_remote::RetryPolicy;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> RemoteClient {
        RemoteClient::with_defaults()
            .unwrap()
            .with_policy(RetryPolicy::new(1).with_base_delay(Duration::from_millis(1)))
    }

    #[test]
    fn base_url_keeps_its_path() {
        let url = api_base_url("https://llm.example.com/v1").unwrap();
        assert_eq!(
            url.join("chat/completions").unwrap().as_str(),
            "https://llm.example.com/v1/chat/completions"
        );
        assert!(api_base_url("not a url").is_err());
    }

    #[test]
    fn extracts_string_and_part_content() {
        let plain = json!({"choices": [{"message": {"content": "hello"}}]});
        assert_eq!(extract_message_text(&plain).as_deref(), Some("hello"));

        let parts = json!({"choices": [{"message": {"content": [{"text": "a"}, {"text": "b"}]}}]});
        assert_eq!(extract_message_text(&parts).as_deref(), Some("ab"));

        assert!(extract_message_text(&json!({"choices": []})).is_none());
        assert!(extract_message_text(&json!({"choices": [{"message": {"content": "  "}}]})).is_none());
    }

    #[test]
    fn settings_without_key_build_nothing() {
        let settings = ApiSettings {
            api_key: None,
            base_url: "https://api.openai.com/v1/".into(),
            model: "gpt-4o-mini".into(),
            timeout: Duration::from_secs(5),
        };
        assert!(OpenAiChat::from_settings(client(), &settings).unwrap().is_none());
    }

    #[tokio::test]
    async fn posts_messages_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-test"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"summary\":\"ok\"}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let chat = OpenAiChat::new(
            client(),
            &format!("{}/v1", server.uri()),
            " sk-test ".into(),
            "gpt-test".into(),
        )
        .unwrap();
        let text = chat
            .complete(&[ChatMessage::system("s"), ChatMessage::user("u")])
            .await
            .unwrap();
        assert_eq!(text, "{\"summary\":\"ok\"}");
        assert_eq!(chat.model(), "gpt-test");
    }

    #[tokio::test]
    async fn rejected_key_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "bad key"}})))
            .expect(1)
            .mount(&server)
            .await;

        let chat = OpenAiChat::new(client(), &server.uri(), "sk".into(), "m".into()).unwrap();
        let err = chat.complete(&[ChatMessage::user("u")]).await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn missing_content_is_an_empty_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": ""}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let chat = OpenAiChat::new(client(), &server.uri(), "sk".into(), "m".into()).unwrap();
        let text = chat.complete(&[ChatMessage::user("u")]).await.unwrap();
        assert!(text.is_empty());
    }
}
