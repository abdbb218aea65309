//! Client side of the conversation.
//!
//! # Architecture
//!
//! - [`ChatSession`]: session identity, send orchestration and reply routing
//! - [`ChatClient`]: transport to the `/chat` endpoint ([`HttpChatClient`])
//! - [`ChatResponse`] / [`ChatReply`]: wire body and the routed domain reply
//! - [`Message`]: an entry in the visible log

pub mod client;
pub mod message;
pub mod response;
pub mod session;

pub use client::{ChatClient, ClientError, HttpChatClient};
pub use message::{Message, Sender, TYPING_TEXT};
pub use response::{ChatReply, ChatRequest, ChatResponse, Meta, TableError, TablePayload};
pub use session::{
    APOLOGY, ChatSession, GREETING, QUICK_ACTIONS, QuickAction, Session, SessionError, Turn,
};
