//! Typed view of the raw objects returned by the Notion API.
//!
//! The crawler persists raw JSON untouched; these types exist to answer
//! three questions about a node: does it have children to recurse into,
//! is it a file to download, and what text does it contribute.

mod block;
pub mod blocks;
pub mod common;

pub use block::{AttachmentKind, Block, ChildDispatch};
pub use blocks::*;
pub use common::*;

use crate::error::AppError;
use crate::types::{NodeId, NodeKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A classified node of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Block(Block),
    Page(Page),
    Database(Database),
}

impl Node {
    /// Classifies `raw` as a node of `kind`.
    pub fn classify(kind: NodeKind, raw: &Value) -> Result<Self, AppError> {
        match kind {
            NodeKind::Block => Block::from_value(raw).map(Node::Block),
            NodeKind::Page => Page::from_value(raw).map(Node::Page),
            NodeKind::Database => Database::from_value(raw).map(Node::Database),
        }
    }

    pub fn id(&self) -> &NodeId {
        match self {
            Node::Block(block) => block.id(),
            Node::Page(page) => &page.id,
            Node::Database(database) => &database.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Block(_) => NodeKind::Block,
            Node::Page(_) => NodeKind::Page,
            Node::Database(_) => NodeKind::Database,
        }
    }

    /// Whether rows of an inline database hang off this node.
    pub fn has_inline_database(&self) -> bool {
        match self {
            Node::Block(block) => block.has_inline_database(),
            Node::Page(_) | Node::Database(_) => false,
        }
    }

    /// Returns a human-readable display title for this node.
    pub fn display_title(&self) -> String {
        match self {
            Node::Page(page) => page.title.clone(),
            Node::Database(database) => {
                let text = plain_text_of(&database.title);
                if text.is_empty() {
                    "Untitled Database".to_string()
                } else {
                    text
                }
            }
            Node::Block(block) => match &block.payload {
                BlockPayload::ChildPage(t) | BlockPayload::ChildDatabase(t) => t.title.clone(),
                _ => format!("Block {}", block.id()),
            },
        }
    }
}

/// A Notion page. Property values stay raw; only the title is extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: NodeId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub parent: Option<Parent>,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
    #[serde(skip)]
    pub title: String,
}

impl Page {
    pub fn from_value(raw: &Value) -> Result<Self, AppError> {
        expect_object(raw, "page")?;
        let mut page = Page::deserialize(raw).map_err(|e| AppError::Classification {
            id: block::id_hint(raw).to_string(),
            kind: "page".to_string(),
            reason: e.to_string(),
        })?;
        page.title = page.title_from_properties();
        Ok(page)
    }

    /// The plain text of the property whose type is `title`, or "Untitled".
    fn title_from_properties(&self) -> String {
        self.properties
            .values()
            .find(|property| property.get("type").and_then(Value::as_str) == Some("title"))
            .and_then(|property| property.get("title"))
            .and_then(|runs| Vec::<RichTextItem>::deserialize(runs).ok())
            .map(|runs| plain_text_of(&runs))
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| "Untitled".to_string())
    }
}

/// A Notion database: its rows are pages, queried separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub id: NodeId,
    #[serde(default)]
    pub title: Vec<RichTextItem>,
    #[serde(default)]
    pub description: Vec<RichTextItem>,
    #[serde(default)]
    pub is_inline: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub parent: Option<Parent>,
    #[serde(default)]
    pub icon: Option<Icon>,
}

impl Database {
    pub fn from_value(raw: &Value) -> Result<Self, AppError> {
        expect_object(raw, "database")?;
        Database::deserialize(raw).map_err(|e| AppError::Classification {
            id: block::id_hint(raw).to_string(),
            kind: "database".to_string(),
            reason: e.to_string(),
        })
    }
}

fn expect_object(raw: &Value, expected: &str) -> Result<(), AppError> {
    match raw.get("object").and_then(Value::as_str) {
        Some(object) if object != expected => Err(AppError::Classification {
            id: block::id_hint(raw).to_string(),
            kind: expected.to_string(),
            reason: format!("expected a {} object, got `{}`", expected, object),
        }),
        _ => Ok(()),
    }
}
