//! Chat bubble rendering.

use std::sync::LazyLock;

use regex::Regex;

use crate::chat::message::{Message, Sender};

use super::target::{MessageNode, RenderTarget, RenderedNode};

/// Default avatar for the assistant.
pub const BOT_AVATAR: &str = "/static/bot-avatar.svg";
/// Default avatar for the user.
pub const USER_AVATAR: &str = "/static/user-avatar.svg";

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>(\s*</img>)?").expect("img tag pattern"));

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));

/// Strip inline image markup and surrounding whitespace.
///
/// Other markup is left in place: bot replies are rendered as HTML and the
/// assistant service is trusted for everything except images.
pub fn sanitize(text: &str) -> String {
    IMG_TAG.replace_all(text, "").trim().to_string()
}

/// Text content of a markup fragment.
pub fn plain_text(html: &str) -> String {
    let stripped = ANY_TAG.replace_all(html, "");
    html_escape::decode_html_entities(stripped.as_ref()).into_owned()
}

/// Turns reply strings into chat bubbles.
#[derive(Debug, Clone)]
pub struct MessageRenderer {
    bot_avatar: String,
    user_avatar: String,
}

impl Default for MessageRenderer {
    fn default() -> Self {
        Self::new(BOT_AVATAR, USER_AVATAR)
    }
}

impl MessageRenderer {
    pub fn new(bot_avatar: impl Into<String>, user_avatar: impl Into<String>) -> Self {
        Self {
            bot_avatar: bot_avatar.into(),
            user_avatar: user_avatar.into(),
        }
    }

    fn avatar(&self, sender: Sender) -> &str {
        match sender {
            Sender::Bot => &self.bot_avatar,
            Sender::User => &self.user_avatar,
        }
    }

    /// Build the bubble for `message` without displaying it.
    ///
    /// User-authored text is escaped; bot text keeps its markup minus images.
    pub fn bubble(&self, message: &Message) -> MessageNode {
        let content = match message.sender {
            Sender::Bot => sanitize(&message.content),
            Sender::User => html_escape::encode_text(message.content.trim()).into_owned(),
        };
        let sender = message.sender.as_str();
        let typing = if message.is_transient { " typing" } else { "" };
        let avatar = html_escape::encode_double_quoted_attribute(self.avatar(message.sender));

        let html = format!(
            r#"<div class="message {sender}{typing}"><img class="avatar" src="{avatar}" alt="{sender}"><div class="bubble">{content}</div></div>"#
        );

        MessageNode {
            sender: message.sender,
            text: plain_text(&content),
            html,
            transient: message.is_transient,
        }
    }

    /// Append `text` from `sender` to the target.
    pub fn render(&self, target: &mut dyn RenderTarget, text: &str, sender: Sender) {
        let message = match sender {
            Sender::Bot => Message::bot(text),
            Sender::User => Message::user(text),
        };
        self.append(target, &message);
    }

    /// Append an arbitrary log entry, transient placeholder included.
    ///
    /// A previous transient entry is always removed first so that at most one
    /// is ever visible.
    pub fn append(&self, target: &mut dyn RenderTarget, message: &Message) {
        target.remove_transient();
        target.append(RenderedNode::Message(self.bubble(message)));
        target.scroll_to_end();
    }
}
