//! Conversation session lifecycle.
//!
//! A [`ChatSession`] owns the current [`Session`] identity, the visible
//! message log and the render target. `start` and `send_message` are its only
//! mutators; both are exclusive with an outstanding send.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::client::ChatClient;
use super::message::Message;
use super::response::{ChatReply, ChatRequest};
use crate::render::{MessageRenderer, RenderTarget, TableRenderer};

/// Greeting appended by every `start`.
pub const GREETING: &str =
    "Hello! I'm Tara, your SLCI assistant. Ask me about our services or minimum wages in any state.";

/// Bot message shown when a send fails.
pub const APOLOGY: &str = "Sorry, I couldn't reach the server. Please try again in a moment.";

/// A shortcut shown under the greeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickAction {
    pub label: &'static str,
    /// Message sent when the action is chosen.
    pub prompt: &'static str,
}

/// Category shortcuts offered at the start of a session.
pub const QUICK_ACTIONS: &[QuickAction] = &[
    QuickAction {
        label: "Our Services",
        prompt: "What services do you offer?",
    },
    QuickAction {
        label: "Minimum Wages",
        prompt: "Show minimum wages in Delhi",
    },
    QuickAction {
        label: "Book Appointment",
        prompt: "How can I book an appointment?",
    },
    QuickAction {
        label: "Contact Us",
        prompt: "How can I contact you?",
    },
    QuickAction {
        label: "Office Hours",
        prompt: "What are your office hours?",
    },
];

/// One continuous conversational context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Errors returned by [`ChatSession`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A send is outstanding; the call was rejected without side effects.
    #[error("a message is already being sent")]
    Busy,
}

/// How a call to [`ChatSession::send_message`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// Blank input; nothing happened.
    Ignored,
    /// A text bubble was rendered.
    Text,
    /// A table card was rendered.
    Table,
    /// The reply had nothing to show.
    Empty,
    /// The request failed and the apology was shown.
    Failed,
}

struct State<T> {
    session: Option<Session>,
    log: Vec<Message>,
    target: T,
}

/// Client-side conversation with the assistant.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tara_chat::chat::{ChatSession, HttpChatClient};
/// use tara_chat::render::MemoryTarget;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Arc::new(HttpChatClient::new("http://localhost:5000")?);
/// let chat = ChatSession::new(client, MemoryTarget::new());
///
/// chat.send_message("minimum wages in Delhi").await?;
/// chat.with_target(|target| println!("{} tables", target.tables().count()));
/// # Ok(())
/// # }
/// ```
pub struct ChatSession<T: RenderTarget> {
    client: Arc<dyn ChatClient>,
    state: Mutex<State<T>>,
    in_flight: AtomicBool,
    messages: MessageRenderer,
    tables: TableRenderer,
}

impl<T: RenderTarget> std::fmt::Debug for ChatSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("session", &self.session())
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Marks a send (or reset) as outstanding for as long as it lives.
///
/// Dropping it releases the busy flag and removes a leftover transient
/// message, which also covers a send future dropped mid-flight.
struct InFlight<'a, T: RenderTarget> {
    owner: &'a ChatSession<T>,
}

impl<T: RenderTarget> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        let mut state = self.owner.lock();
        if state.log.iter().any(|m| m.is_transient) {
            clear_transient(&mut state);
        }
        drop(state);
        self.owner.in_flight.store(false, Ordering::Release);
    }
}

fn clear_transient<T: RenderTarget>(state: &mut State<T>) {
    state.log.retain(|m| !m.is_transient);
    state.target.remove_transient();
}

impl<T: RenderTarget> ChatSession<T> {
    /// Create a session-less chat; the first send (or `start`) mints a session.
    pub fn new(client: Arc<dyn ChatClient>, target: T) -> Self {
        Self::with_renderer(client, target, MessageRenderer::default())
    }

    /// Create a chat with custom bubble rendering.
    pub fn with_renderer(client: Arc<dyn ChatClient>, target: T, messages: MessageRenderer) -> Self {
        Self {
            client,
            state: Mutex::new(State {
                session: None,
                log: Vec::new(),
                target,
            }),
            in_flight: AtomicBool::new(false),
            messages,
            tables: TableRenderer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(&self) -> Result<InFlight<'_, T>, SessionError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_held| SessionError::Busy)?;
        Ok(InFlight { owner: self })
    }

    /// The current session, if one has been started.
    pub fn session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    /// Snapshot of the visible message log.
    pub fn log(&self) -> Vec<Message> {
        self.lock().log.clone()
    }

    /// Whether a send is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run `f` with the render target.
    pub fn with_target<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock().target)
    }

    /// Quick actions offered after `start`.
    pub fn quick_actions(&self) -> &'static [QuickAction] {
        QUICK_ACTIONS
    }

    /// Begin a fresh session: clear the target, mint a new identity, show the
    /// quick actions and greet.
    pub fn start(&self) -> Result<Session, SessionError> {
        let _flight = self.acquire()?;
        let mut state = self.lock();
        Ok(self.reset(&mut state))
    }

    fn reset(&self, state: &mut State<T>) -> Session {
        state.target.clear();
        state.log.clear();

        let session = Session::new();
        state.session = Some(session.clone());
        state.target.set_quick_actions_visible(true);
        self.push(state, Message::bot(GREETING));

        info!(
            name: "chat.session.started",
            session_id = %session.id(),
            "Chat session started"
        );
        session
    }

    fn push(&self, state: &mut State<T>, message: Message) {
        state.log.retain(|m| !m.is_transient);
        self.messages.append(&mut state.target, &message);
        state.log.push(message);
    }

    /// Send a user message and render the reply.
    ///
    /// Blank input is ignored. Transport failures are recovered here by
    /// showing the apology message; the only error is [`SessionError::Busy`].
    pub async fn send_message(&self, text: &str) -> Result<Turn, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            debug!(name: "chat.send.ignored", "Ignoring blank message");
            return Ok(Turn::Ignored);
        }

        let _flight = self.acquire()?;

        let request = {
            let mut state = self.lock();
            let session_id = match state.session.as_ref().map(|s| s.id().to_string()) {
                Some(id) => id,
                None => self.reset(&mut state).id().to_string(),
            };
            state.target.set_quick_actions_visible(false);
            self.push(&mut state, Message::user(text));
            self.push(&mut state, Message::typing());
            ChatRequest {
                message: text.to_string(),
                session_id,
            }
        };

        debug!(
            name: "chat.send.started",
            session_id = %request.session_id,
            "Sending message"
        );
        let result = self.client.send(&request).await;

        let mut state = self.lock();
        clear_transient(&mut state);

        let turn = match result {
            Ok(response) => match ChatReply::from_response(response) {
                ChatReply::Table { table, meta } => {
                    self.tables.render(&mut state.target, table, meta);
                    Turn::Table
                }
                ChatReply::Text(reply) => {
                    self.push(&mut state, Message::bot(reply));
                    Turn::Text
                }
                ChatReply::Empty => Turn::Empty,
            },
            Err(e) => {
                warn!(
                    name: "chat.send.failed",
                    session_id = %request.session_id,
                    error = %e,
                    "Chat request failed"
                );
                self.push(&mut state, Message::bot(APOLOGY));
                Turn::Failed
            }
        };
        drop(state);

        info!(
            name: "chat.send.completed",
            session_id = %request.session_id,
            turn = ?turn,
            "Chat turn completed"
        );
        Ok(turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::client::ClientError;
    use crate::chat::message::Sender;
    use crate::chat::response::ChatResponse;
    use crate::render::MemoryTarget;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Replays canned results and records requests.
    #[derive(Default)]
    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<ChatResponse, ClientError>>>,
        requests: Mutex<Vec<ChatRequest>>,
        gate: Option<Arc<Notify>>,
        hang: bool,
    }

    impl ScriptedClient {
        fn with(replies: Vec<Result<ChatResponse, ClientError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.hang {
                std::future::pending::<()>().await;
            }
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ChatResponse::default()))
        }
    }

    fn response(value: serde_json::Value) -> Result<ChatResponse, ClientError> {
        Ok(serde_json::from_value(value).unwrap())
    }

    fn chat(client: &Arc<ScriptedClient>) -> ChatSession<MemoryTarget> {
        ChatSession::new(Arc::clone(client) as Arc<dyn ChatClient>, MemoryTarget::new())
    }

    #[test]
    fn test_start_greets_once() {
        let client = Arc::new(ScriptedClient::default());
        let chat = chat(&client);

        let first = chat.start().unwrap();
        let second = chat.start().unwrap();
        assert_ne!(first.id(), second.id());

        let log = chat.log();
        assert_eq!(log, vec![Message::bot(GREETING)]);
        chat.with_target(|t| {
            assert_eq!(t.messages().count(), 1);
            assert_eq!(t.transient_count(), 0);
            assert!(t.quick_actions_visible());
        });
    }

    #[tokio::test]
    async fn test_hello_without_session() {
        let client = Arc::new(ScriptedClient::with(vec![response(json!({ "reply": "Hi there!" }))]));
        let chat = chat(&client);
        assert!(chat.session().is_none());

        let turn = chat.send_message("Hello").await.unwrap();
        assert_eq!(turn, Turn::Text);

        let session = chat.session().unwrap();
        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message, "Hello");
        assert_eq!(requests[0].session_id, session.id());

        let log = chat.log();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0], Message::bot(GREETING));
        assert_eq!(log[1], Message::user("Hello"));
        assert_eq!(log[2], Message::bot("Hi there!"));

        chat.with_target(|t| {
            assert_eq!(t.transient_count(), 0);
            assert!(!t.quick_actions_visible());
        });
    }

    #[tokio::test]
    async fn test_session_id_persists_across_sends() {
        let client = Arc::new(ScriptedClient::default());
        let chat = chat(&client);

        chat.send_message("one").await.unwrap();
        chat.send_message("two").await.unwrap();

        let requests = client.requests();
        assert_eq!(requests[0].session_id, requests[1].session_id);
    }

    #[tokio::test]
    async fn test_blank_input_is_noop() {
        let client = Arc::new(ScriptedClient::default());
        let chat = chat(&client);

        assert_eq!(chat.send_message("   \n\t").await.unwrap(), Turn::Ignored);
        assert!(chat.session().is_none());
        assert!(chat.log().is_empty());
        assert!(client.requests().is_empty());
        chat.with_target(|t| assert!(t.nodes().is_empty()));
    }

    #[tokio::test]
    async fn test_table_precedence() {
        let client = Arc::new(ScriptedClient::with(vec![response(json!({
            "reply": "this text must not render",
            "table": [["State", "Rate"], ["Delhi", "500"]],
            "meta": { "state": "Delhi", "pdf_url": "http://x/doc.pdf" }
        }))]));
        let chat = chat(&client);

        assert_eq!(chat.send_message("wages delhi").await.unwrap(), Turn::Table);

        chat.with_target(|t| {
            let cards: Vec<_> = t.tables().collect();
            assert_eq!(cards.len(), 1);
            let table = cards[0].table();
            assert_eq!(table.headers().len(), 2);
            assert!(table.rows().iter().all(|r| r.len() == table.headers().len()));
            assert_eq!(table.rows().len(), 1);
            assert!(!t.messages().any(|m| m.text.contains("must not render")));
            assert_eq!(t.transient_count(), 0);
        });
        assert!(chat.log().iter().all(|m| m.content != "this text must not render"));
    }

    #[tokio::test]
    async fn test_failure_shows_apology() {
        let client = Arc::new(ScriptedClient::with(vec![Err(ClientError::Api {
            status: 502,
            message: "bad gateway".into(),
        })]));
        let chat = chat(&client);

        assert_eq!(chat.send_message("Hello").await.unwrap(), Turn::Failed);

        let last = chat.log().pop().unwrap();
        assert_eq!(last, Message::bot(APOLOGY));
        chat.with_target(|t| {
            assert_eq!(t.transient_count(), 0);
            assert_eq!(t.messages().filter(|m| m.sender == Sender::Bot).count(), 2);
        });
    }

    #[tokio::test]
    async fn test_empty_reply_renders_nothing() {
        let client = Arc::new(ScriptedClient::with(vec![response(json!({ "unexpected": true }))]));
        let chat = chat(&client);

        assert_eq!(chat.send_message("Hello").await.unwrap(), Turn::Empty);
        assert_eq!(chat.log().len(), 2);
        chat.with_target(|t| {
            assert_eq!(t.nodes().len(), 2);
            assert_eq!(t.transient_count(), 0);
        });
    }

    #[tokio::test]
    async fn test_wrong_shaped_reply_is_silent() {
        let client = Arc::new(ScriptedClient::with(vec![
            response(json!({ "table": "Delhi" })),
            response(json!({ "reply": "Hi", "meta": { "pdf_url": 7 } })),
            response(json!({ "reply": 5 })),
        ]));
        let chat = chat(&client);

        assert_eq!(chat.send_message("Hello").await.unwrap(), Turn::Empty);
        assert_eq!(chat.send_message("Hello").await.unwrap(), Turn::Text);
        assert_eq!(chat.send_message("Hello").await.unwrap(), Turn::Empty);

        let log = chat.log();
        assert!(log.iter().all(|m| m.content != APOLOGY));
        assert_eq!(log.last().unwrap(), &Message::user("Hello"));
        assert!(log.contains(&Message::bot("Hi")));
    }

    #[tokio::test]
    async fn test_second_send_rejected_while_busy() {
        let gate = Arc::new(Notify::new());
        let client = Arc::new(ScriptedClient {
            replies: Mutex::new(vec![response(json!({ "reply": "done" }))].into()),
            gate: Some(Arc::clone(&gate)),
            ..ScriptedClient::default()
        });
        let chat = chat(&client);

        let observer = async {
            tokio::task::yield_now().await;
            assert!(chat.is_busy());
            assert_eq!(chat.send_message("again").await, Err(SessionError::Busy));
            assert_eq!(chat.start(), Err(SessionError::Busy));
            assert_eq!(chat.log().iter().filter(|m| m.is_transient).count(), 1);
            gate.notify_one();
        };

        let (turn, ()) = tokio::join!(chat.send_message("first"), observer);
        assert_eq!(turn.unwrap(), Turn::Text);
        assert!(!chat.is_busy());
        assert_eq!(client.requests().len(), 1);
        assert_eq!(chat.log().iter().filter(|m| m.is_transient).count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_send_clears_transient() {
        let client = Arc::new(ScriptedClient {
            hang: true,
            ..ScriptedClient::default()
        });
        let chat = chat(&client);

        let result = tokio::time::timeout(Duration::from_millis(20), chat.send_message("Hello")).await;
        assert!(result.is_err());

        assert!(!chat.is_busy());
        assert!(chat.log().iter().all(|m| !m.is_transient));
        chat.with_target(|t| assert_eq!(t.transient_count(), 0));
        assert!(chat.start().is_ok());
    }

    fn reply_strategy() -> BoxedStrategy<serde_json::Value> {
        prop_oneof![
            "[ a-zA-Z<>/]{0,20}".prop_map(serde_json::Value::from),
            any::<i64>().prop_map(serde_json::Value::from),
            Just(serde_json::Value::Null),
        ]
        .boxed()
    }

    /// Reply shapes a backend may produce, including failures.
    fn outcome_strategy() -> impl Strategy<Value = Result<serde_json::Value, u16>> {
        let cell = prop_oneof![
            "[A-Za-z0-9 ₹]{0,12}".prop_map(serde_json::Value::from),
            any::<i32>().prop_map(serde_json::Value::from),
            Just(serde_json::Value::Null),
        ];
        let grid = prop::collection::vec(prop::collection::vec(cell, 0..4), 0..5)
            .prop_map(serde_json::Value::from);
        prop_oneof![
            (reply_strategy(), grid)
                .prop_map(|(reply, table)| Ok(json!({ "reply": reply, "table": table }))),
            reply_strategy().prop_map(|reply| Ok(json!({ "reply": reply }))),
            Just(Ok(json!("not an object"))),
            (400u16..600).prop_map(Err),
        ]
    }

    proptest! {
        #[test]
        fn prop_no_transient_left_after_any_turn(
            outcomes in prop::collection::vec(outcome_strategy(), 1..6)
        ) {
            let replies = outcomes
                .into_iter()
                .map(|outcome| match outcome {
                    Ok(body) => Ok(serde_json::from_value(body).unwrap()),
                    Err(status) => Err(ClientError::Api { status, message: String::new() }),
                })
                .collect::<Vec<_>>();
            let sends = replies.len();
            let client = Arc::new(ScriptedClient::with(replies));
            let chat = chat(&client);

            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                for _ in 0..sends {
                    chat.send_message("wages").await.unwrap();
                }
            });

            prop_assert!(!chat.is_busy());
            prop_assert!(chat.log().iter().all(|m| !m.is_transient));
            chat.with_target(|t| assert_eq!(t.transient_count(), 0));
        }
    }
}
