//! The chat widget page served at `/`.

use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::chat::message::Message;
use crate::chat::session::{GREETING, QUICK_ACTIONS};
use crate::render::MessageRenderer;

/// Generate the HTML shell around `content`.
fn html_shell(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="SLCI assistant for labour law and minimum wages">
    <title>{title} - SLCI</title>
    <style>{STYLE}</style>
</head>
<body>
    <main id="app">
        {content}
    </main>
    <script>{SCRIPT}</script>
</body>
</html>"#
    )
}

/// Render the widget page with the greeting and quick actions in place.
pub fn widget_page(renderer: &MessageRenderer) -> String {
    let greeting = renderer.bubble(&Message::bot(GREETING)).html;

    let mut actions = String::new();
    for action in QUICK_ACTIONS {
        let _ = write!(
            actions,
            r#"<button type="button" class="quick-action" data-prompt="{}">{}</button>"#,
            encode_double_quoted_attribute(action.prompt),
            encode_text(action.label)
        );
    }

    let content = format!(
        r#"<section class="chat-widget">
            <header class="chat-header">
                <h1>Tara</h1>
                <button type="button" id="reset" title="New conversation">New chat</button>
            </header>
            <div id="chat-log" class="chat-log">{greeting}</div>
            <div id="quick-actions" class="quick-actions">{actions}</div>
            <form id="chat-form" class="chat-form" autocomplete="off">
                <input name="message" placeholder="Type your message..." aria-label="Message">
                <button type="submit">Send</button>
            </form>
        </section>"#
    );

    html_shell("Tara", &content)
}

const STYLE: &str = r"
body { margin: 0; font-family: Helvetica, Arial, sans-serif; background: #f4f6f8; }
.chat-widget { max-width: 720px; margin: 0 auto; height: 100vh; display: flex; flex-direction: column; background: #fff; }
.chat-header { display: flex; justify-content: space-between; align-items: center; padding: 12px 16px; background: #2980b9; color: #fff; }
.chat-header h1 { font-size: 18px; margin: 0; }
.chat-log { flex: 1; overflow-y: auto; padding: 16px; }
.message { display: flex; gap: 8px; margin-bottom: 12px; align-items: flex-start; }
.message.user { flex-direction: row-reverse; }
.message .avatar { width: 32px; height: 32px; border-radius: 50%; }
.bubble { max-width: 75%; padding: 8px 12px; border-radius: 12px; background: #ecf0f1; white-space: pre-wrap; }
.message.user .bubble { background: #2980b9; color: #fff; }
.message.typing .bubble { font-style: italic; color: #7f8c8d; }
.table-card { border: 1px solid #dfe6e9; border-radius: 8px; padding: 12px; margin-bottom: 12px; }
.table-scroll { overflow-x: auto; }
.wage-table { border-collapse: collapse; width: 100%; font-size: 13px; }
.wage-table th { background: #2980b9; color: #fff; }
.wage-table th, .wage-table td { border: 1px solid #dfe6e9; padding: 4px 6px; text-align: left; }
.quick-actions { display: flex; flex-wrap: wrap; gap: 6px; padding: 0 16px 8px; }
.quick-actions[hidden] { display: none; }
.chat-form { display: flex; gap: 8px; padding: 12px 16px; border-top: 1px solid #dfe6e9; }
.chat-form input { flex: 1; padding: 8px; }
";

const SCRIPT: &str = r#"
(() => {
  const log = document.getElementById('chat-log');
  const actions = document.getElementById('quick-actions');
  const form = document.getElementById('chat-form');
  const greeting = log.innerHTML;
  let sessionId = null;
  let busy = false;

  const esc = (s) => String(s).replace(/[&<>"']/g, (c) => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;',"'":'&#39;'}[c]));
  const scroll = () => { log.scrollTop = log.scrollHeight; };
  const dropTyping = () => log.querySelectorAll('.message.typing').forEach((n) => n.remove());

  function bubble(sender, html, typing) {
    dropTyping();
    const avatar = sender === 'bot' ? '/static/bot-avatar.svg' : '/static/user-avatar.svg';
    const div = document.createElement('div');
    div.className = 'message ' + sender + (typing ? ' typing' : '');
    div.innerHTML = '<img class="avatar" src="' + avatar + '" alt="' + sender + '"><div class="bubble">' + html + '</div>';
    log.appendChild(div);
    scroll();
  }

  // Same routing as ChatReply: a non-empty grid wins but must be rectangular,
  // otherwise the turn is empty; then a non-blank string reply.
  const isGrid = (t) => Array.isArray(t) && t.every(Array.isArray);
  const rectangular = (g) => g[0].length > 0 && g.every((row) => row.length === g[0].length);
  const cell = (c) => (c === null || c === undefined ? '' : typeof c === 'string' ? c : JSON.stringify(c));
  const isObject = (v) => v !== null && typeof v === 'object' && !Array.isArray(v);

  function route(data) {
    if (!isObject(data)) return null;
    if (isGrid(data.table) && data.table.length) {
      if (!rectangular(data.table)) return null;
      return { table: data.table.map((row) => row.map(cell)), meta: isObject(data.meta) ? data.meta : null };
    }
    if (typeof data.reply === 'string' && data.reply.trim()) return { reply: data.reply };
    return null;
  }

  function table(grid, meta) {
    dropTyping();
    const card = document.createElement('div');
    card.className = 'table-card';
    let html = '';
    if (meta) {
      html += '<div class="table-meta">';
      [['State', meta.state], ['Act', meta.act_name], ['DA', meta.da], ['Effective From', meta.effective_from]]
        .forEach(([k, v]) => { html += '<p><strong>' + k + ':</strong> ' + esc(v ?? '') + '</p>'; });
      if (typeof meta.pdf_url === 'string' && meta.pdf_url.trim()) html += '<a href="' + esc(meta.pdf_url) + '" target="_blank" rel="noopener">View Notification</a>';
      html += '</div>';
    }
    html += '<div class="table-scroll"><table class="wage-table"><thead><tr>';
    grid[0].forEach((h) => { html += '<th>' + esc(h) + '</th>'; });
    html += '</tr></thead><tbody>';
    grid.slice(1).forEach((row) => { html += '<tr>' + row.map((c) => '<td>' + esc(c) + '</td>').join('') + '</tr>'; });
    html += '</tbody></table></div><button type="button" class="export-pdf">Download PDF</button>';
    card.innerHTML = html;
    card.querySelector('.export-pdf').addEventListener('click', () => exportPdf(grid, meta));
    log.appendChild(card);
    scroll();
  }

  async function exportPdf(grid, meta) {
    try {
      const res = await fetch('/export', { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify({ table: grid, meta }) });
      if (!res.ok) throw new Error(res.status);
      const name = (res.headers.get('Content-Disposition') || '').match(/filename="([^"]+)"/);
      const link = document.createElement('a');
      link.href = URL.createObjectURL(await res.blob());
      link.download = name ? name[1] : 'Minimum_Wages_Report.pdf';
      link.click();
      URL.revokeObjectURL(link.href);
    } catch (e) {
      alert('Sorry, the PDF could not be generated. Please try again.');
    }
  }

  function start() {
    if (busy) return;
    log.innerHTML = greeting;
    actions.hidden = false;
    sessionId = crypto.randomUUID();
  }

  async function send(text) {
    text = text.trim();
    if (!text || busy) return;
    if (!sessionId) start();
    busy = true;
    actions.hidden = true;
    bubble('user', esc(text));
    bubble('bot', 'Typing...', true);
    try {
      const res = await fetch('/chat', { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify({ message: text, session_id: sessionId }) });
      if (!res.ok) throw new Error(res.status);
      const turn = route(await res.json());
      dropTyping();
      if (turn && turn.table) table(turn.table, turn.meta);
      else if (turn) bubble('bot', turn.reply.replace(/<img\b[^>]*>/gi, '').trim());
    } catch (e) {
      bubble('bot', "Sorry, I couldn't reach the server. Please try again in a moment.");
    } finally {
      dropTyping();
      busy = false;
    }
  }

  form.addEventListener('submit', (e) => {
    e.preventDefault();
    const input = form.elements.message;
    send(input.value);
    input.value = '';
  });
  actions.addEventListener('click', (e) => {
    const prompt = e.target.dataset && e.target.dataset.prompt;
    if (prompt) send(prompt);
  });
  document.getElementById('reset').addEventListener('click', start);
  start();
})();
"#;
