//! Console render target used by `tara-chat chat`.
//!
//! Uses `console` for colors (auto-disabled when piped) and `comfy-table` for
//! wage tables.

use std::io::{self, Write};

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use console::style;

use crate::chat::message::Sender;
use crate::chat::session::QUICK_ACTIONS;
use crate::render::{ExportAction, MessageNode, RenderTarget, RenderedNode, TableCard};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const CLEAR_PREVIOUS_LINE: &str = "\x1b[1A\x1b[2K";

/// Prints the conversation to a terminal (or any writer).
///
/// The most recent table card is kept so it can be exported on request.
pub struct TerminalTarget<W: Write + Send> {
    out: W,
    /// Whether cursor control sequences may be used.
    interactive: bool,
    transient_shown: bool,
    last_export: Option<ExportAction>,
}

impl<W: Write + Send> std::fmt::Debug for TerminalTarget<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalTarget")
            .field("interactive", &self.interactive)
            .field("has_export", &self.last_export.is_some())
            .finish_non_exhaustive()
    }
}

impl TerminalTarget<io::Stdout> {
    /// Target printing to standard output.
    pub fn stdout() -> Self {
        let interactive = console::Term::stdout().is_term();
        Self::new(io::stdout(), interactive)
    }
}

impl<W: Write + Send> TerminalTarget<W> {
    pub fn new(out: W, interactive: bool) -> Self {
        Self {
            out,
            interactive,
            transient_shown: false,
            last_export: None,
        }
    }

    /// Export action of the newest table on screen.
    pub fn last_export(&self) -> Option<&ExportAction> {
        self.last_export.as_ref()
    }

    /// Print an informational line outside the conversation.
    pub fn notice(&mut self, text: &str) {
        self.line(&style(text).dim().to_string());
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    // Terminal output is best effort; a closed pipe must not abort the chat.
    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }

    fn print_message(&mut self, node: &MessageNode) {
        let text = match node.sender {
            Sender::Bot if node.transient => style(node.text.as_str()).dim().italic().to_string(),
            Sender::Bot => format!("{} {}", style("Tara:").cyan().bold(), node.text),
            Sender::User => format!("{} {}", style("You:").green().bold(), node.text),
        };
        self.line(&text);
        self.transient_shown = node.transient;
    }

    fn print_table(&mut self, card: &TableCard) {
        if let Some(meta) = card.meta() {
            for (key, value) in [
                ("State", &meta.state),
                ("Act", &meta.act_name),
                ("DA", &meta.da),
                ("Effective From", &meta.effective_from),
            ] {
                self.line(&format!("  {} {value}", style(format!("{key}:")).cyan().bold()));
            }
            if let Some(url) = meta.pdf_link() {
                self.line(&format!("  {} {url}", style("Notification:").cyan().bold()));
            }
        }

        let table = card.table();
        let mut grid = Table::new();
        grid.load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(
                table
                    .headers()
                    .iter()
                    .map(|h| Cell::new(h).fg(Color::Cyan).add_attribute(Attribute::Bold)),
            );
        for row in table.rows() {
            grid.add_row(row.iter().map(Cell::new));
        }
        self.line(&grid.to_string());
        self.notice("Type /export to save this table as a PDF report.");
    }
}

impl<W: Write + Send> RenderTarget for TerminalTarget<W> {
    fn append(&mut self, node: RenderedNode) {
        match node {
            RenderedNode::Message(message) => self.print_message(&message),
            RenderedNode::Table(card) => {
                self.print_table(&card);
                self.transient_shown = false;
                self.last_export = Some(card.export);
            }
        }
    }

    fn remove_transient(&mut self) -> bool {
        if !self.transient_shown {
            return false;
        }
        if self.interactive {
            let _ = write!(self.out, "{CLEAR_PREVIOUS_LINE}");
            let _ = self.out.flush();
        }
        self.transient_shown = false;
        true
    }

    fn clear(&mut self) {
        if self.interactive {
            let _ = write!(self.out, "{CLEAR_SCREEN}");
        } else {
            self.line("---");
        }
        self.transient_shown = false;
        self.last_export = None;
    }

    fn set_quick_actions_visible(&mut self, visible: bool) {
        if !visible {
            return;
        }
        for (index, action) in QUICK_ACTIONS.iter().enumerate() {
            self.line(&format!("  {} {}", style(format!("[{}]", index + 1)).yellow(), action.label));
        }
    }

    fn alert(&mut self, message: &str) {
        self.line(&format!("{} {}", style("✗").red(), style(message).bright()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::Message;
    use crate::chat::response::TablePayload;
    use crate::render::{MessageRenderer, TableRenderer};
    use std::sync::Arc;

    fn output(target: TerminalTarget<Vec<u8>>) -> String {
        console::strip_ansi_codes(&String::from_utf8(target.into_inner()).unwrap()).into_owned()
    }

    #[test]
    fn test_prints_messages_and_tracks_transient() {
        let renderer = MessageRenderer::default();
        let mut target = TerminalTarget::new(Vec::new(), false);

        renderer.append(&mut target, &Message::user("hi <there>"));
        renderer.append(&mut target, &Message::typing());
        assert!(target.remove_transient());
        assert!(!target.remove_transient());
        renderer.append(&mut target, &Message::bot("<b>Hello</b>"));

        let text = output(target);
        assert!(text.contains("You: hi <there>"));
        assert!(text.contains("Tara: Hello"));
    }

    #[test]
    fn test_table_keeps_export_action() {
        let mut target = TerminalTarget::new(Vec::new(), false);
        let table = Arc::new(
            TablePayload::from_grid(vec![
                vec!["Category".into(), "Rate".into()],
                vec!["Skilled".into(), "21215".into()],
            ])
            .unwrap(),
        );

        TableRenderer.render(&mut target, table, None);
        assert_eq!(target.last_export().unwrap().table().rows().len(), 1);

        target.clear();
        assert!(target.last_export().is_none());

        let text = output(target);
        assert!(text.contains("Skilled"));
        assert!(text.contains("/export"));
    }

    #[test]
    fn test_quick_actions_are_numbered() {
        let mut target = TerminalTarget::new(Vec::new(), false);
        target.set_quick_actions_visible(true);
        target.alert("boom");

        let text = output(target);
        assert!(text.contains("[1] Our Services"));
        assert!(text.contains("boom"));
    }
}
