//! Server-side conversation history.
//!
//! The backend records every `/chat` turn under the session id the widget
//! sends, so a conversation can be inspected and expired as a unit.
//!
//! # Example
//!
//! ```rust
//! use tara_chat::session::ConversationStore;
//!
//! let store = ConversationStore::new();
//! let conversation = store.get_or_create("3f2b-session");
//! conversation.add_user_message("hello");
//!
//! assert_eq!(store.get_or_create("3f2b-session").message_count(), 1);
//! ```

mod conversation;

pub use conversation::{Conversation, ConversationStore, DEFAULT_CONVERSATION_TIMEOUT};
