//! Tara: SLCI chat assistant
//!
//! A conversational widget for labour-law questions. When the backend answers
//! with tabular minimum wage data the widget renders it as a table card that
//! can be exported as a PDF report.
//!
//! # Architecture
//!
//! - **Client**: [`chat::ChatSession`] drives a conversation against the
//!   `/chat` endpoint and routes each reply to a renderer
//! - **Rendering**: text bubbles and table cards appended to a
//!   [`render::RenderTarget`]
//! - **Export**: paginated PDF reports through the [`export::Document`] trait
//! - **Server**: Axum backend answering `/chat` from the wage directory, the
//!   intent router and an optional LLM
//!
//! # Modules
//!
//! - [`chat`]: session lifecycle, wire types and HTTP client
//! - [`render`]: message and table renderers, render targets
//! - [`export`]: PDF layout and output
//! - [`server`]: HTTP routes
//! - [`wages`]: upstream minimum wage lookup
//! - [`intent`]: keyword intent routing
//! - [`assistant`]: LLM-backed answers with keyword fallback
//! - [`llm`]: OpenAI-compatible completion driver
//! - [`session`]: server-side conversation history
//! - [`terminal`]: console render target for the `chat` subcommand

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod assistant;
pub mod chat;
pub mod config;
pub mod export;
pub mod intent;
pub mod llm;
pub mod render;
pub mod server;
pub mod session;
pub mod terminal;
pub mod ui;
pub mod wages;

use std::sync::Arc;

use tracing::info;

use crate::assistant::Assistant;
use crate::config::AppConfig;
use crate::export::PdfExporter;
use crate::llm::{ChatCompletionsDriver, LlmDriver, LlmSettings};
use crate::render::MessageRenderer;
use crate::session::ConversationStore;
use crate::wages::WageDirectory;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Conversation history keyed by the widget's session id.
    pub conversations: ConversationStore,
    /// Upstream minimum wage directory.
    pub wages: Arc<WageDirectory>,
    /// Answers for everything that is not a wage lookup.
    pub assistant: Arc<Assistant>,
    /// Report generator for `/export`.
    pub exporter: Arc<PdfExporter>,
    /// Bubble renderer for the widget page.
    pub renderer: Arc<MessageRenderer>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let wages = WageDirectory::new(config.wages.api_url.as_deref(), config.wages.timeout())?;

        let llm = match LlmSettings::from_config(&config.llm) {
            Some(settings) => {
                info!(
                    name: "llm.config.loaded",
                    provider = ?settings.provider,
                    model = %settings.model,
                    "LLM answers enabled"
                );
                Some(Arc::new(ChatCompletionsDriver::new(settings)?) as Arc<dyn LlmDriver>)
            }
            None => None,
        };

        Ok(Self {
            conversations: ConversationStore::new(),
            wages: Arc::new(wages),
            assistant: Arc::new(Assistant::new(llm)),
            exporter: Arc::new(PdfExporter::new(config.export.output_dir.clone())),
            renderer: Arc::new(MessageRenderer::default()),
            config,
        })
    }
}
