//! Answers for messages that are not wage lookups.
//!
//! With an LLM configured, the model classifies the message first (keywords
//! resolve its free-form label) and answers general questions using the
//! session's recorded turns. Without one, or when a classification call
//! fails, the keyword router decides on its own.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::chat::message::Message;
use crate::intent::{GENERAL_REPLY, Intent};
use crate::llm::{LlmDriver, LlmMessage};

/// Words that ask for a longer, structured explanation.
pub const DETAIL_WORDS: &[&str] = &["explain", "detail", "describe", "kyu", "kaise", "samjhao"];

/// Most recent recorded turns sent along with a general question.
pub const MAX_HISTORY: usize = 10;

const SHORT_PROMPT: &str = "You are Tara, the SLCI assistant for labour law, compliance and \
HR services.

Rules:
1. Keep answers very short, simple and clear.
2. Use bullet points (•) instead of paragraphs.
3. Reply in the language the user writes in (Hindi, English or Hinglish).
4. Stay friendly and professional.
5. If you are unsure, still give a short, generally helpful answer.";

const DETAILED_PROMPT: &str = "You are Tara, the SLCI assistant for labour law, compliance and \
HR services. The user wants a detailed explanation.

Rules:
1. Give a clear, structured explanation with headings and bullet points.
2. Use simple language, matching the user's language (Hindi, English or Hinglish).
3. Stay professional and helpful.";

const CATEGORIES: &str = "greeting, services, contact, appointment, hours, location, founder, \
motto, staffing, industries, experience, policy, general_qa";

/// Whether `message` asks for a detailed answer.
pub fn wants_detail(message: &str) -> bool {
    let lower = message.to_lowercase();
    DETAIL_WORDS.iter().any(|word| lower.contains(word))
}

/// Routes non-wage messages to canned replies or the LLM.
#[derive(Debug, Clone, Default)]
pub struct Assistant {
    llm: Option<Arc<dyn LlmDriver>>,
}

impl Assistant {
    pub fn new(llm: Option<Arc<dyn LlmDriver>>) -> Self {
        Self { llm }
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Classify `message`, asking the model first when one is configured.
    pub async fn classify(&self, message: &str) -> Intent {
        let Some(llm) = &self.llm else {
            return Intent::classify(message);
        };

        let prompt = format!(
            "Classify the user's query into exactly one of these categories:\n[{CATEGORIES}]\n\n\
             User Query: {message}\nCategory:"
        );
        match llm.complete(&[LlmMessage::user(prompt)]).await {
            Ok(label) => Intent::from_label(&label, message),
            Err(e) => {
                warn!(name: "assistant.classify.failed", error = %e, "LLM classification failed");
                Intent::classify(message)
            }
        }
    }

    /// Answer `message`. `history` holds the session's earlier turns, oldest
    /// first, not including `message` itself.
    pub async fn answer(&self, history: &[Message], message: &str) -> String {
        let intent = self.classify(message).await;
        debug!(name: "chat.intent.classified", intent = %intent, "Intent classified");

        if intent != Intent::GeneralQa {
            return intent.reply().to_string();
        }
        let Some(llm) = &self.llm else {
            return GENERAL_REPLY.to_string();
        };

        match llm.complete(&general_prompt(history, message)).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(name: "assistant.answer.failed", error = %e, "LLM answer failed");
                format!("⚠ Sorry, I faced an issue generating an answer: {e}")
            }
        }
    }
}

/// System prompt, the tail of the history, then the question.
fn general_prompt(history: &[Message], message: &str) -> Vec<LlmMessage> {
    let system = if wants_detail(message) {
        DETAILED_PROMPT
    } else {
        SHORT_PROMPT
    };
    let recent = &history[history.len().saturating_sub(MAX_HISTORY)..];

    std::iter::once(LlmMessage::system(system))
        .chain(recent.iter().map(LlmMessage::from))
        .chain(std::iter::once(LlmMessage::user(message)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatCompletionsDriver, LlmError, LlmSettings, MessageRole, Provider};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Replays canned answers and records every prompt.
    #[derive(Debug, Default)]
    struct ScriptedLlm {
        answers: Mutex<VecDeque<Result<String, u16>>>,
        prompts: Mutex<Vec<Vec<LlmMessage>>>,
    }

    impl ScriptedLlm {
        fn with(answers: Vec<Result<&str, u16>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into_iter().map(|a| a.map(String::from)).collect()),
                ..Self::default()
            })
        }
    }

    #[async_trait]
    impl LlmDriver for ScriptedLlm {
        async fn complete(&self, messages: &[LlmMessage]) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            match self.answers.lock().unwrap().pop_front() {
                Some(Ok(answer)) => Ok(answer),
                Some(Err(status)) => Err(LlmError::Api {
                    status,
                    message: "boom".into(),
                }),
                None => Err(LlmError::EmptyReply),
            }
        }
    }

    fn assistant(llm: &Arc<ScriptedLlm>) -> Assistant {
        Assistant::new(Some(Arc::clone(llm) as Arc<dyn LlmDriver>))
    }

    #[tokio::test]
    async fn test_keyword_only_without_llm() {
        let assistant = Assistant::default();
        assert!(!assistant.has_llm());
        assert_eq!(assistant.answer(&[], "hello").await, Intent::Greeting.reply());
        assert_eq!(assistant.answer(&[], "what is gratuity").await, GENERAL_REPLY);
    }

    #[tokio::test]
    async fn test_llm_label_picks_canned_reply() {
        let llm = ScriptedLlm::with(vec![Ok("Hours")]);
        let answer = assistant(&llm).answer(&[], "when are you open?").await;
        assert_eq!(answer, Intent::Hours.reply());
        assert_eq!(llm.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_general_question_uses_history() {
        let llm = ScriptedLlm::with(vec![Ok("general_qa"), Ok("• Gratuity is ...")]);
        let history = vec![Message::user("hi"), Message::bot("Hey there!")];

        let answer = assistant(&llm).answer(&history, "what is gratuity").await;
        assert_eq!(answer, "• Gratuity is ...");

        let prompts = llm.prompts.lock().unwrap();
        let general = &prompts[1];
        assert_eq!(general.len(), 4);
        assert_eq!(general[0].content, SHORT_PROMPT);
        assert_eq!(general[1], LlmMessage::user("hi"));
        assert_eq!(general[2].role, MessageRole::Assistant);
        assert_eq!(general[3], LlmMessage::user("what is gratuity"));
    }

    #[tokio::test]
    async fn test_detail_words_switch_prompt() {
        let llm = ScriptedLlm::with(vec![Ok("general_qa"), Ok("## PF")]);
        assistant(&llm).answer(&[], "PF kaise kaam karta hai").await;

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts[1][0].content, DETAILED_PROMPT);
    }

    #[tokio::test]
    async fn test_failed_classification_falls_back_to_keywords() {
        let llm = ScriptedLlm::with(vec![Err(503)]);
        let answer = assistant(&llm).answer(&[], "your office address").await;
        assert_eq!(answer, Intent::Location.reply());
    }

    #[tokio::test]
    async fn test_failed_answer_is_reported() {
        let llm = ScriptedLlm::with(vec![Ok("general_qa"), Err(500)]);
        let answer = assistant(&llm).answer(&[], "what is gratuity").await;
        assert!(answer.starts_with("⚠ Sorry, I faced an issue generating an answer"));
    }

    #[test]
    fn test_history_is_capped() {
        let history: Vec<Message> = (0..25).map(|i| Message::user(i.to_string())).collect();
        let prompt = general_prompt(&history, "q");
        assert_eq!(prompt.len(), MAX_HISTORY + 2);
        assert_eq!(prompt[1].content, "15");
    }

    #[test]
    fn test_wants_detail() {
        assert!(wants_detail("Please EXPLAIN ESI"));
        assert!(wants_detail("samjhao"));
        assert!(!wants_detail("what is ESI"));
    }

    #[tokio::test]
    async fn test_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Category:"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "general_qa" } }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("Tara"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "• ESI covers medical care." } }]
            })))
            .mount(&server)
            .await;

        let driver = ChatCompletionsDriver::new(LlmSettings {
            base_url: server.uri(),
            api_key: None,
            model: "llama-3.1-8b-instant".into(),
            provider: Provider::Generic,
            temperature: 0.3,
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        let assistant = Assistant::new(Some(Arc::new(driver)));

        assert_eq!(assistant.answer(&[], "what is esi").await, "• ESI covers medical care.");
    }
}
