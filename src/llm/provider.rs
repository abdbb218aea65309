//! Provider detection.
//!
//! All supported providers speak the OpenAI Chat Completions protocol; they
//! differ in where the endpoint lives and which model is a sensible default.

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Groq (groq.com)
    Groq,
    /// `OpenRouter` (openrouter.ai)
    OpenRouter,
    /// Together AI (together.ai, together.xyz)
    TogetherAI,
    /// Any other OpenAI-compatible server
    Generic,
}

impl Provider {
    /// Detect provider from base URL.
    #[must_use]
    pub fn detect_from_url(base_url: &str) -> Self {
        let lower = base_url.to_lowercase();

        if lower.contains("groq.com") {
            Self::Groq
        } else if lower.contains("openrouter.ai") {
            Self::OpenRouter
        } else if lower.contains("together.ai") || lower.contains("together.xyz") {
            Self::TogetherAI
        } else if lower.contains("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    /// Model used when none is configured.
    #[must_use]
    pub const fn default_model(self) -> Option<&'static str> {
        match self {
            Self::Groq => Some("llama-3.1-8b-instant"),
            Self::OpenAI => Some("gpt-4o-mini"),
            Self::OpenRouter | Self::TogetherAI | Self::Generic => None,
        }
    }

    /// Build the chat completions URL.
    ///
    /// A base URL that already ends in `/v1` is not given a second one.
    #[must_use]
    pub fn build_chat_url(self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_groq() {
        assert_eq!(Provider::detect_from_url("https://api.groq.com/openai"), Provider::Groq);
    }

    #[test]
    fn test_detect_others() {
        assert_eq!(Provider::detect_from_url("https://api.openai.com"), Provider::OpenAI);
        assert_eq!(Provider::detect_from_url("https://openrouter.ai/api"), Provider::OpenRouter);
        assert_eq!(Provider::detect_from_url("http://127.0.0.1:8080"), Provider::Generic);
    }

    #[test]
    fn test_build_url() {
        let provider = Provider::Groq;
        assert_eq!(
            provider.build_chat_url("https://api.groq.com/openai/"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(
            Provider::OpenRouter.build_chat_url("https://openrouter.ai/api/v1"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }
}
