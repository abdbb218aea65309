//! Wire types for the `/chat` endpoint and the domain reply they decode into.
//!
//! The wire shape is loose: a body may carry a `reply`, a `table` (+ `meta`),
//! both, or neither. [`ChatReply::from_response`] is the single place that
//! decides which branch a turn takes, with the table winning over text.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Request body for `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Session the message belongs to.
    pub session_id: String,
}

/// Response body for `POST /chat`.
///
/// Decoding is tolerant per field: any JSON value parses, and a `reply`,
/// `table` or `meta` of the wrong shape is dropped (and logged) instead of
/// failing the whole body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatResponse {
    /// Plain or HTML-bearing text reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    /// Raw grid; row 0 is the header row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<Vec<Vec<String>>>,
    /// Metadata accompanying a table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl ChatResponse {
    /// A text-only response.
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            ..Self::default()
        }
    }

    /// Decode a parsed body field by field.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut body) = value else {
            warn!(
                name: "chat.reply.malformed_body",
                kind = json_kind(&value),
                "Response body is not an object"
            );
            return Self::default();
        };

        let reply = body.remove("reply").and_then(|v| {
            tolerant("reply", v, |v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
        });
        let table = body.remove("table").and_then(|v| tolerant("table", v, decode_grid));
        let meta = body.remove("meta").and_then(|v| {
            tolerant("meta", v, |v| match v {
                Value::Object(_) => serde_json::from_value(v).ok(),
                _ => None,
            })
        });

        Self { reply, table, meta }
    }
}

impl<'de> Deserialize<'de> for ChatResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::from_value(Value::deserialize(deserializer)?))
    }
}

/// Descriptive sidecar fields accompanying a table reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub act_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub da: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub effective_from: String,
    /// Link to the official notification document.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_link")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt")]
    pub category_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt")]
    pub zones: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt")]
    pub updated_as_on: Option<String>,
}

impl Meta {
    /// The notification link, if present and non-blank.
    pub fn pdf_link(&self) -> Option<&str> {
        self.pdf_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Errors raised when a raw grid does not form a valid table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("table has no header row")]
    MissingHeader,
    #[error("header row is empty")]
    EmptyHeader,
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// A rectangular string grid: one header row plus zero or more body rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePayload {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TablePayload {
    /// Build a payload from headers and rows, checking every row matches the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, TableError> {
        if headers.is_empty() {
            return Err(TableError::EmptyHeader);
        }
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(TableError::RaggedRow {
                row: index + 1,
                expected: headers.len(),
                found: row.len(),
            });
        }
        Ok(Self { headers, rows })
    }

    /// Build a payload from a wire grid whose first row holds the headers.
    pub fn from_grid(grid: Vec<Vec<String>>) -> Result<Self, TableError> {
        let mut grid = grid.into_iter();
        let headers = grid.next().ok_or(TableError::MissingHeader)?;
        Self::new(headers, grid.collect())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Body rows, excluding the header row.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Back to the wire grid shape.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        std::iter::once(self.headers.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }
}

/// What a single chat turn resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    /// Structured wage data.
    Table {
        table: Arc<TablePayload>,
        meta: Option<Arc<Meta>>,
    },
    /// A text bubble.
    Text(String),
    /// Nothing to render.
    Empty,
}

impl ChatReply {
    /// Decide the branch for a response: a non-empty table wins, then a
    /// non-blank reply, otherwise the turn is empty.
    ///
    /// A table that violates the grid invariants is treated as malformed and
    /// yields [`ChatReply::Empty`] rather than falling back to the text.
    pub fn from_response(response: ChatResponse) -> Self {
        if let Some(grid) = response.table.filter(|grid| !grid.is_empty()) {
            return match TablePayload::from_grid(grid) {
                Ok(table) => Self::Table {
                    table: Arc::new(table),
                    meta: response.meta.map(Arc::new),
                },
                Err(e) => {
                    warn!(name: "chat.reply.malformed_table", error = %e, "Discarding malformed table");
                    Self::Empty
                }
            };
        }

        match response.reply {
            Some(reply) if !reply.trim().is_empty() => Self::Text(reply),
            _ => Self::Empty,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lenient deserializers: upstream data mixes strings, numbers and nulls.
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?))
}

fn lenient_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .filter(|v| !v.is_null())
        .map(value_to_string))
}

/// Only a string is a usable link; anything else is dropped.
fn lenient_link<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| {
        tolerant("meta.pdf_url", v, |v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
    }))
}

/// A list of lists; cells may be any scalar.
fn decode_grid(value: Value) -> Option<Vec<Vec<String>>> {
    let Value::Array(rows) = value else {
        return None;
    };
    rows.into_iter()
        .map(|row| match row {
            Value::Array(cells) => Some(cells.into_iter().map(value_to_string).collect()),
            _ => None,
        })
        .collect()
}

/// Run `decode` on a present field; `null` counts as absent and a value it
/// rejects is logged and dropped.
fn tolerant<T>(field: &'static str, value: Value, decode: impl FnOnce(Value) -> Option<T>) -> Option<T> {
    if value.is_null() {
        return None;
    }
    let kind = json_kind(&value);
    let decoded = decode(value);
    if decoded.is_none() {
        warn!(
            name: "chat.reply.malformed_field",
            field,
            kind,
            "Ignoring response field with unexpected shape"
        );
    }
    decoded
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
