// src/api/responses.rs
//! Wire-level response envelopes.
//!
//! Objects themselves stay as raw JSON so they can be persisted exactly as
//! received; only the list envelope and error bodies are typed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// Error bodies are decoded with notion-client's definition of the envelope.
pub use notion_client::objects::error::Error as NotionError;

/// One page of a paginated list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse {
    #[serde(default = "default_list_object")]
    pub object: String,
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

fn default_list_object() -> String {
    "list".to_string()
}

impl PaginatedResponse {
    /// A final page holding `results`.
    pub fn last(results: Vec<Value>) -> Self {
        Self {
            object: default_list_object(),
            results,
            next_cursor: None,
            has_more: false,
        }
    }

    /// A page followed by another at `next_cursor`.
    pub fn partial(results: Vec<Value>, next_cursor: impl Into<String>) -> Self {
        Self {
            object: default_list_object(),
            results,
            next_cursor: Some(next_cursor.into()),
            has_more: true,
        }
    }
}
