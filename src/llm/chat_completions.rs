//! OpenAI Chat Completions API driver.

use async_trait::async_trait;
use serde::Deserialize;

use super::{LlmDriver, LlmError, LlmMessage, LlmSettings};

/// Driver for the OpenAI Chat Completions API (`/v1/chat/completions`).
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    url: String,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("url", &self.url)
            .field("settings", &self.settings)
            .finish()
    }
}

impl ChatCompletionsDriver {
    /// Create a driver whose requests give up after `settings.timeout`.
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            url: settings.provider.build_chat_url(&settings.base_url),
            http,
            settings,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmDriver for ChatCompletionsDriver {
    async fn complete(&self, messages: &[LlmMessage]) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "stream": false,
            "temperature": self.settings.temperature,
            "messages": messages,
        });

        let mut rb = self.http.post(&self.url).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = rb.bearer_auth(k);
        }

        let resp = rb.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_else(|_| "Unknown error".into());
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: CompletionResponse = resp.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Provider;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn driver(base_url: &str) -> ChatCompletionsDriver {
        ChatCompletionsDriver::new(LlmSettings {
            base_url: base_url.to_string(),
            api_key: Some("test-key".into()),
            model: "llama-3.1-8b-instant".into(),
            provider: Provider::Generic,
            temperature: 0.3,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "llama-3.1-8b-instant",
                "stream": false,
                "messages": [{ "role": "user", "content": "hi" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "  • Hello  " } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = driver(&server.uri()).complete(&[LlmMessage::user("hi")]).await.unwrap();
        assert_eq!(answer, "• Hello");
    }

    #[tokio::test]
    async fn test_error_status_and_empty_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let driver = driver(&server.uri());
        let err = driver.complete(&[LlmMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }));

        let err = driver.complete(&[LlmMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyReply));
    }
}
