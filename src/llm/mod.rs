//! LLM driver trait and an OpenAI-compatible implementation.
//!
//! The backend only needs single, non-streaming completions: one request
//! carrying the system prompt plus conversation turns, one text answer back.
//!
//! # Example
//!
//! ```rust,no_run
//! use tara_chat::llm::{ChatCompletionsDriver, LlmDriver, LlmMessage, LlmSettings, Provider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = LlmSettings {
//!     base_url: "https://api.groq.com/openai".to_string(),
//!     api_key: Some("gsk-...".to_string()),
//!     model: "llama-3.1-8b-instant".to_string(),
//!     provider: Provider::Groq,
//!     temperature: 0.3,
//!     timeout: std::time::Duration::from_secs(20),
//! };
//! let driver = ChatCompletionsDriver::new(settings)?;
//! let answer = driver.complete(&[LlmMessage::user("What is EPF?")]).await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod chat_completions;
pub mod provider;

pub use chat_completions::ChatCompletionsDriver;
pub use provider::Provider;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::chat::message::{Message, Sender};
use crate::config::LlmConfig;

/// LLM connection and model settings.
#[derive(Clone)]
pub struct LlmSettings {
    /// Base URL for the API (e.g. `https://api.groq.com/openai`).
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Detected from `base_url`.
    pub provider: Provider,
    pub temperature: f32,
    pub timeout: Duration,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("provider", &self.provider)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl LlmSettings {
    /// Settings from configuration, or `None` when no LLM is configured.
    ///
    /// The model falls back to the provider's default; a provider without one
    /// and no configured model disables the LLM.
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())?;
        let provider = Provider::detect_from_url(base_url);

        let model = config
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .or_else(|| provider.default_model());
        let Some(model) = model else {
            warn!(
                name: "llm.config.no_model",
                base_url = %base_url,
                "LLM base URL set without a model; falling back to keyword replies"
            );
            return None;
        };

        Some(Self {
            base_url: base_url.to_string(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            model: model.to_string(),
            provider,
            temperature: config.temperature,
            timeout: config.timeout(),
        })
    }
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One turn sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Message> for LlmMessage {
    fn from(message: &Message) -> Self {
        match message.sender {
            Sender::User => Self::user(message.content.as_str()),
            Sender::Bot => Self::assistant(message.content.as_str()),
        }
    }
}

/// Errors raised by an [`LlmDriver`].
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The completion carried no text.
    #[error("model returned an empty answer")]
    EmptyReply,
}

/// Anything that can complete a conversation.
#[async_trait]
pub trait LlmDriver: Send + Sync + std::fmt::Debug {
    /// Send `messages` and return the model's answer text.
    async fn complete(&self, messages: &[LlmMessage]) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: Option<&str>, model: Option<&str>) -> LlmConfig {
        LlmConfig {
            base_url: base_url.map(Into::into),
            model: model.map(Into::into),
            api_key: Some("  ".into()),
            timeout_secs: 5,
            temperature: 0.3,
        }
    }

    #[test]
    fn test_unconfigured_llm_is_none() {
        assert!(LlmSettings::from_config(&config(None, None)).is_none());
        assert!(LlmSettings::from_config(&config(Some("  "), Some("m"))).is_none());
    }

    #[test]
    fn test_groq_gets_default_model() {
        let settings = LlmSettings::from_config(&config(Some("https://api.groq.com/openai"), None)).unwrap();
        assert_eq!(settings.provider, Provider::Groq);
        assert_eq!(settings.model, "llama-3.1-8b-instant");
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_generic_provider_needs_model() {
        assert!(LlmSettings::from_config(&config(Some("http://localhost:11434"), None)).is_none());

        let settings =
            LlmSettings::from_config(&config(Some("http://localhost:11434"), Some("llama3"))).unwrap();
        assert_eq!(settings.model, "llama3");
    }

    #[test]
    fn test_history_roles() {
        let user = LlmMessage::from(&Message::user("hi"));
        let bot = LlmMessage::from(&Message::bot("hello"));
        assert_eq!(user.role, MessageRole::User);
        assert_eq!(bot.role, MessageRole::Assistant);
        assert_eq!(
            serde_json::to_value(&bot).unwrap(),
            serde_json::json!({ "role": "assistant", "content": "hello" })
        );
    }
}
