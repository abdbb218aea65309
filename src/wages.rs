//! Minimum wage lookup against the upstream wage directory.
//!
//! The upstream endpoint returns a JSON array of state records:
//!
//! ```json
//! [{ "state_name": "Delhi", "api_slug": "delhi",
//!    "meta_data": { "table_data": [["Category", "Rate"], ["Skilled", "21215"]],
//!                   "act_name": "...", "dearness_allowance": "...", "pdf_url": "..." } }]
//! ```
//!
//! [`WageDirectory::lookup`] turns one record into a `/chat` response that
//! carries both a text summary and the table with its [`Meta`].

use std::fmt::Write as _;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::chat::response::{ChatResponse, Meta, value_to_string};

/// States and union territories the backend recognises in a message.
pub const STATE_LIST: &[&str] = &[
    "Andaman and Nicobar Islands",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chandigarh",
    "Chhattisgarh",
    "Dadra and Nagar Haveli",
    "Daman and Diu",
    "Delhi",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jammu and Kashmir",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Ladakh",
    "Lakshadweep",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Puducherry",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
];

/// Phrases that route a message to the wage lookup.
pub const WAGE_KEYWORDS: &[&str] = &["minimum wage", "minimum wages", "min wage", "wages"];

/// Reply for a wage question that names no known state.
pub const STATE_PROMPT: &str = "Please specify a state like Delhi, Bihar, Assam etc.";

/// Reply when the directory has no record for the state.
pub const STATE_NOT_FOUND: &str = "❌ State not found. Please check the state name.";

/// Placeholder for metadata the directory leaves out.
const NOT_AVAILABLE: &str = "NA";

/// Whether `message` asks about minimum wages.
pub fn is_wage_query(message: &str) -> bool {
    let lower = message.to_lowercase();
    WAGE_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// The first state from [`STATE_LIST`] mentioned in `message`.
pub fn detect_state(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    STATE_LIST
        .iter()
        .copied()
        .find(|state| lower.contains(&state.to_lowercase()))
}

/// Errors raised while talking to the wage directory.
#[derive(Error, Debug)]
pub enum WageError {
    /// No upstream URL was configured.
    #[error("minimum wage API URL is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct WageRecord {
    #[serde(default)]
    state_name: String,
    #[serde(default)]
    api_slug: String,
    #[serde(default)]
    meta_data: Option<WageMetaData>,
}

#[derive(Debug, Default, Deserialize)]
struct WageMetaData {
    #[serde(default)]
    table_data: Vec<Vec<Value>>,
    state_name: Option<Value>,
    act_name: Option<Value>,
    category_count: Option<Value>,
    zones: Option<Value>,
    effective_from: Option<Value>,
    updated_as_on: Option<Value>,
    dearness_allowance: Option<Value>,
    pdf_url: Option<Value>,
}

fn or_na(value: Option<Value>) -> String {
    value
        .filter(|v| !v.is_null())
        .map_or_else(|| NOT_AVAILABLE.to_string(), value_to_string)
}

impl WageRecord {
    fn matches(&self, query: &str) -> bool {
        self.state_name.to_lowercase().contains(query) || self.api_slug.to_lowercase().contains(query)
    }

    fn into_report(self) -> WageReport {
        let data = self.meta_data.unwrap_or_default();
        let state = data
            .state_name
            .filter(|v| !v.is_null())
            .map_or(self.state_name, value_to_string);

        let table = data
            .table_data
            .into_iter()
            .map(|row| row.into_iter().map(value_to_string).collect())
            .collect();

        let meta = Meta {
            state,
            act_name: or_na(data.act_name),
            da: or_na(data.dearness_allowance),
            effective_from: or_na(data.effective_from),
            pdf_url: data
                .pdf_url
                .map(value_to_string)
                .filter(|url| !url.trim().is_empty()),
            category_count: Some(or_na(data.category_count)),
            zones: Some(or_na(data.zones)),
            updated_as_on: Some(or_na(data.updated_as_on)),
        };

        WageReport { table, meta }
    }
}

/// One state's wage schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WageReport {
    /// Raw grid; row 0 is the header row.
    pub table: Vec<Vec<String>>,
    pub meta: Meta,
}

impl WageReport {
    /// Human-readable summary of the schedule.
    pub fn summary(&self) -> String {
        let meta = &self.meta;
        let na = NOT_AVAILABLE.to_string();
        let mut text = format!("📍 **Minimum Wages for {}**\n\n", meta.state);
        let _ = writeln!(text, "📘 **Act / Rule**: {}", meta.act_name);
        let _ = writeln!(
            text,
            "🏷 **Category Count**: {}",
            meta.category_count.as_ref().unwrap_or(&na)
        );
        let _ = writeln!(text, "🗺 **Zones**: {}", meta.zones.as_ref().unwrap_or(&na));
        let _ = writeln!(text, "🧮 **Dearness Allowance (DA)**: {}\n", meta.da);
        let _ = writeln!(text, "🗓 **Effective From**: {}", meta.effective_from);
        let _ = writeln!(
            text,
            "📌 **Updated As On**: {}\n",
            meta.updated_as_on.as_ref().unwrap_or(&na)
        );

        text.push_str("📊 **Wage Structure**\n\n");
        for row in &self.table {
            text.push_str(&row.join(" | "));
            text.push('\n');
        }
        text.push('\n');

        if let Some(url) = meta.pdf_link() {
            let _ = write!(text, "📄 **Govt. Notification PDF**: {url}");
        }
        text
    }

    /// The `/chat` body for this report: summary text plus table and meta.
    pub fn into_response(self) -> ChatResponse {
        ChatResponse {
            reply: Some(self.summary()),
            table: Some(self.table),
            meta: Some(self.meta),
        }
    }
}

/// Client for the upstream wage directory.
#[derive(Debug, Clone)]
pub struct WageDirectory {
    api_url: Option<Url>,
    http: reqwest::Client,
}

impl WageDirectory {
    /// Create a directory client. `api_url` of `None` makes every lookup fail
    /// with [`WageError::NotConfigured`].
    pub fn new(api_url: Option<&str>, timeout: Duration) -> Result<Self, WageError> {
        let api_url = api_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(Url::parse)
            .transpose()?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { api_url, http })
    }

    pub fn api_url(&self) -> Option<&Url> {
        self.api_url.as_ref()
    }

    async fn fetch(&self) -> Result<Vec<WageRecord>, WageError> {
        let url = self.api_url.clone().ok_or(WageError::NotConfigured)?;
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(WageError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Find the first record whose name or slug contains `state`.
    pub async fn find(&self, state: &str) -> Result<Option<WageReport>, WageError> {
        let query = state.trim().to_lowercase();
        let report = self
            .fetch()
            .await?
            .into_iter()
            .find(|record| record.matches(&query))
            .map(WageRecord::into_report);
        Ok(report)
    }

    /// Look up `state` and build the `/chat` response.
    ///
    /// Misses and upstream failures become text replies.
    pub async fn lookup(&self, state: &str) -> ChatResponse {
        match self.find(state).await {
            Ok(Some(report)) => {
                debug!(
                    name: "wages.lookup.found",
                    state = %report.meta.state,
                    rows = report.table.len(),
                    "Wage schedule found"
                );
                report.into_response()
            }
            Ok(None) => {
                debug!(name: "wages.lookup.missing", state = %state, "No wage schedule for state");
                ChatResponse::text(STATE_NOT_FOUND)
            }
            Err(e) => {
                warn!(name: "wages.lookup.failed", state = %state, error = %e, "Wage lookup failed");
                ChatResponse::text(format!("⚠ Error fetching data: {e}"))
            }
        }
    }
}
