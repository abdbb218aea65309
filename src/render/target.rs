//! Display surfaces the renderers append to.

use crate::chat::message::Sender;

use super::table::TableCard;

/// A rendered chat bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageNode {
    pub sender: Sender,
    /// Sanitized markup for the bubble, avatar included.
    pub html: String,
    /// Plain text of the bubble after sanitizing.
    pub text: String,
    pub transient: bool,
}

/// Anything a renderer can put on screen.
#[derive(Debug, Clone)]
pub enum RenderedNode {
    Message(MessageNode),
    Table(TableCard),
}

impl RenderedNode {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Message(node) if node.transient)
    }
}

/// An append-only surface that shows the conversation.
///
/// Implementations decide how nodes are displayed; the renderers only rely on
/// append order, removal of the transient entry, and clearing.
pub trait RenderTarget: Send {
    /// Append a node after every existing one.
    fn append(&mut self, node: RenderedNode);

    /// Remove the transient placeholder, returning whether one was present.
    fn remove_transient(&mut self) -> bool;

    /// Remove everything.
    fn clear(&mut self);

    /// Bring the newest node into view.
    fn scroll_to_end(&mut self) {}

    /// Show or hide the quick-action controls.
    fn set_quick_actions_visible(&mut self, visible: bool);

    /// Raise a blocking, user-visible alert.
    fn alert(&mut self, message: &str);
}

/// In-memory [`RenderTarget`], used for headless sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    nodes: Vec<RenderedNode>,
    quick_actions_visible: bool,
    alerts: Vec<String>,
    scroll_position: usize,
}

impl MemoryTarget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[RenderedNode] {
        &self.nodes
    }

    /// Message bubbles in display order.
    pub fn messages(&self) -> impl Iterator<Item = &MessageNode> {
        self.nodes.iter().filter_map(|node| match node {
            RenderedNode::Message(message) => Some(message),
            RenderedNode::Table(_) => None,
        })
    }

    /// Table cards in display order.
    pub fn tables(&self) -> impl Iterator<Item = &TableCard> {
        self.nodes.iter().filter_map(|node| match node {
            RenderedNode::Table(card) => Some(card),
            RenderedNode::Message(_) => None,
        })
    }

    pub fn transient_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_transient()).count()
    }

    pub fn quick_actions_visible(&self) -> bool {
        self.quick_actions_visible
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    /// Index of the node last scrolled into view.
    pub fn scroll_position(&self) -> usize {
        self.scroll_position
    }
}

impl RenderTarget for MemoryTarget {
    fn append(&mut self, node: RenderedNode) {
        self.nodes.push(node);
    }

    fn remove_transient(&mut self) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|node| !node.is_transient());
        before != self.nodes.len()
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.scroll_position = 0;
    }

    fn scroll_to_end(&mut self) {
        self.scroll_position = self.nodes.len().saturating_sub(1);
    }

    fn set_quick_actions_visible(&mut self, visible: bool) {
        self.quick_actions_visible = visible;
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(transient: bool) -> RenderedNode {
        RenderedNode::Message(MessageNode {
            sender: Sender::Bot,
            html: String::new(),
            text: String::new(),
            transient,
        })
    }

    #[test]
    fn test_remove_transient() {
        let mut target = MemoryTarget::new();
        target.append(node(false));
        target.append(node(true));

        assert_eq!(target.transient_count(), 1);
        assert!(target.remove_transient());
        assert_eq!(target.transient_count(), 0);
        assert_eq!(target.nodes().len(), 1);
        assert!(!target.remove_transient());
    }

    #[test]
    fn test_clear_and_scroll() {
        let mut target = MemoryTarget::new();
        target.append(node(false));
        target.append(node(false));
        target.scroll_to_end();
        assert_eq!(target.scroll_position(), 1);

        target.clear();
        assert!(target.nodes().is_empty());
        assert_eq!(target.scroll_position(), 0);
    }
}
