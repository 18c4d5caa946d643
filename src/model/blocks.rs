//! Per-type block payloads, decoded from the object keyed by the block's
//! `type` field.

use super::common::{plain_text_of, FilePayload, Icon, RichTextItem};
use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// Paragraphs, list items, toggles, quotes and templates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub rich_text: Vec<RichTextItem>,
    #[serde(default)]
    pub color: Option<String>,
}

impl TextContent {
    pub fn plain_text(&self) -> String {
        plain_text_of(&self.rich_text)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadingContent {
    #[serde(default)]
    pub rich_text: Vec<RichTextItem>,
    #[serde(default)]
    pub is_toggleable: bool,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToDoContent {
    #[serde(default)]
    pub rich_text: Vec<RichTextItem>,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalloutContent {
    #[serde(default)]
    pub rich_text: Vec<RichTextItem>,
    #[serde(default)]
    pub icon: Option<Icon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeContent {
    #[serde(default)]
    pub rich_text: Vec<RichTextItem>,
    #[serde(default)]
    pub caption: Vec<RichTextItem>,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationContent {
    pub expression: String,
}

/// Bookmarks and embeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkContent {
    pub url: String,
    #[serde(default)]
    pub caption: Vec<RichTextItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPreviewContent {
    pub url: String,
}

/// Target of a `link_to_page` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LinkTarget {
    #[serde(rename = "page_id")]
    Page { page_id: NodeId },
    #[serde(rename = "database_id")]
    Database { database_id: NodeId },
    #[serde(rename = "comment_id")]
    Comment { comment_id: String },
}

/// `child_page` and `child_database` blocks carry only a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleContent {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableContent {
    pub table_width: usize,
    #[serde(default)]
    pub has_column_header: bool,
    #[serde(default)]
    pub has_row_header: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRowContent {
    pub cells: Vec<Vec<RichTextItem>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedContent {
    /// `None` for the original block, the source block id for copies.
    #[serde(default)]
    pub synced_from: Option<SyncedFrom>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedFrom {
    pub block_id: NodeId,
}

/// The type-specific part of a block. Exactly one is present per block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockPayload {
    Paragraph(TextContent),
    Heading1(HeadingContent),
    Heading2(HeadingContent),
    Heading3(HeadingContent),
    BulletedListItem(TextContent),
    NumberedListItem(TextContent),
    ToDo(ToDoContent),
    Toggle(TextContent),
    Quote(TextContent),
    Callout(CalloutContent),
    Code(CodeContent),
    Equation(EquationContent),
    Divider,
    Breadcrumb,
    TableOfContents,
    Image(FilePayload),
    Video(FilePayload),
    Audio(FilePayload),
    File(FilePayload),
    Pdf(FilePayload),
    Bookmark(LinkContent),
    Embed(LinkContent),
    LinkPreview(LinkPreviewContent),
    LinkToPage(LinkTarget),
    ChildPage(TitleContent),
    ChildDatabase(TitleContent),
    Table(TableContent),
    TableRow(TableRowContent),
    ColumnList,
    Column,
    SyncedBlock(SyncedContent),
    Template(TextContent),
    /// A block type this client does not model. The raw snapshot is still
    /// persisted; only typed access is lost.
    Unsupported { block_type: String },
}
