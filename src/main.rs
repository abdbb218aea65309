//! Tara chat assistant
//!
//! Entry point: `tara-chat serve` runs the backend, `tara-chat chat` talks to
//! a running backend from the terminal.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tara_chat::chat::{ChatClient, ChatSession, HttpChatClient, QUICK_ACTIONS, SessionError};
use tara_chat::config::{AppConfig, Cli, Command};
use tara_chat::export::PdfExporter;
use tara_chat::server::start_server;
use tara_chat::terminal::TerminalTarget;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before clap reads its env fallbacks
    let _ = dotenv();

    let cli = Cli::parse();
    let command = cli.command();

    // The REPL shares the terminal with logs, so keep it quiet by default.
    let default_level = match command {
        Command::Serve => "info",
        Command::Chat => "warn",
    };
    init_tracing(cli.log_json, default_level);

    let config = Arc::new(AppConfig::from_cli(&cli).context("Failed to load configuration")?);

    match command {
        Command::Serve => start_server(config).await,
        Command::Chat => run_repl(&config).await,
    }
}

/// Initialize tracing (M-LOG-STRUCTURED)
fn init_tracing(json: bool, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().with_target(true)))
        .init();
}

/// Interactive terminal chat against the configured backend.
async fn run_repl(config: &AppConfig) -> anyhow::Result<()> {
    let client: Arc<dyn ChatClient> = Arc::new(
        HttpChatClient::with_timeout(&config.client.endpoint, config.client.timeout())
            .context("Invalid chat endpoint")?,
    );
    let exporter = PdfExporter::new(config.export.output_dir.clone());
    let chat = ChatSession::new(client, TerminalTarget::stdout());

    info!(
        name: "repl.started",
        endpoint = %config.client.endpoint,
        "Terminal chat started"
    );

    chat.start()?;
    chat.with_target(|t| t.notice("Commands: /reset, /export, /quit. Numbers pick a quick action."));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "/quit" | "/exit" => break,
            "/reset" => {
                chat.start()?;
            }
            "/export" => export_last_table(&chat, &exporter),
            _ => {
                let text = input
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| QUICK_ACTIONS.get(i))
                    .map_or(input, |action| action.prompt);

                if let Err(SessionError::Busy) = chat.send_message(text).await {
                    warn!(name: "repl.send.busy", "Previous message still in flight");
                }
            }
        }
    }

    Ok(())
}

fn export_last_table(chat: &ChatSession<TerminalTarget<std::io::Stdout>>, exporter: &PdfExporter) {
    chat.with_target(|target| {
        let Some(action) = target.last_export().cloned() else {
            target.notice("No table to export yet.");
            return;
        };
        if let Some(path) = action.trigger(exporter, target) {
            target.notice(&format!("Saved {}", path.display()));
        }
    });
}
