use super::blocks::*;
use super::common::{plain_text_of, BlockCommon, FilePayload, Parent};
use crate::error::AppError;
use crate::types::{NodeId, NodeRef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A classified Notion block: shared fields plus exactly one typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub common: BlockCommon,
    pub payload: BlockPayload,
}

/// The fields every block object carries; the remaining keys hold the
/// payload named by `type`.
#[derive(Deserialize)]
struct BlockEnvelope {
    id: NodeId,
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    has_children: bool,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    parent: Option<Parent>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// The media kinds that carry a downloadable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    File,
    Image,
    Video,
    Audio,
    Pdf,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::File => "file",
            AttachmentKind::Image => "image",
            AttachmentKind::Video => "video",
            AttachmentKind::Audio => "audio",
            AttachmentKind::Pdf => "pdf",
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the crawler does with a block found among its parent's children.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildDispatch {
    /// Recurse into the referenced node.
    Visit(NodeRef),
    /// Fetch the block's file into the parent's directory.
    Download(AttachmentKind),
    /// Nothing beyond the parent's children snapshot.
    Leaf,
}

impl Block {
    /// Classifies a raw block object.
    ///
    /// Unknown `type` values yield [`BlockPayload::Unsupported`]. A known
    /// type whose payload is missing or malformed is a classification error.
    pub fn from_value(raw: &Value) -> Result<Self, AppError> {
        let envelope = BlockEnvelope::deserialize(raw)
            .map_err(|e| classification_error(id_hint(raw), e.to_string()))?;
        let BlockEnvelope {
            id,
            block_type,
            has_children,
            archived,
            parent,
            mut rest,
        } = envelope;

        if let Some(object) = rest.get("object").and_then(Value::as_str) {
            if object != "block" {
                return Err(classification_error(
                    id.as_str(),
                    format!("expected a block object, got `{}`", object),
                ));
            }
        }

        let rest = &mut rest;
        let payload = match block_type.as_str() {
            "paragraph" => BlockPayload::Paragraph(take_payload(rest, &id, &block_type)?),
            "heading_1" => BlockPayload::Heading1(take_payload(rest, &id, &block_type)?),
            "heading_2" => BlockPayload::Heading2(take_payload(rest, &id, &block_type)?),
            "heading_3" => BlockPayload::Heading3(take_payload(rest, &id, &block_type)?),
            "bulleted_list_item" => {
                BlockPayload::BulletedListItem(take_payload(rest, &id, &block_type)?)
            }
            "numbered_list_item" => {
                BlockPayload::NumberedListItem(take_payload(rest, &id, &block_type)?)
            }
            "to_do" => BlockPayload::ToDo(take_payload(rest, &id, &block_type)?),
            "toggle" => BlockPayload::Toggle(take_payload(rest, &id, &block_type)?),
            "quote" => BlockPayload::Quote(take_payload(rest, &id, &block_type)?),
            "callout" => BlockPayload::Callout(take_payload(rest, &id, &block_type)?),
            "code" => BlockPayload::Code(take_payload(rest, &id, &block_type)?),
            "equation" => BlockPayload::Equation(take_payload(rest, &id, &block_type)?),
            "divider" => BlockPayload::Divider,
            "breadcrumb" => BlockPayload::Breadcrumb,
            "table_of_contents" => BlockPayload::TableOfContents,
            "image" => BlockPayload::Image(take_payload(rest, &id, &block_type)?),
            "video" => BlockPayload::Video(take_payload(rest, &id, &block_type)?),
            "audio" => BlockPayload::Audio(take_payload(rest, &id, &block_type)?),
            "file" => BlockPayload::File(take_payload(rest, &id, &block_type)?),
            "pdf" => BlockPayload::Pdf(take_payload(rest, &id, &block_type)?),
            "bookmark" => BlockPayload::Bookmark(take_payload(rest, &id, &block_type)?),
            "embed" => BlockPayload::Embed(take_payload(rest, &id, &block_type)?),
            "link_preview" => BlockPayload::LinkPreview(take_payload(rest, &id, &block_type)?),
            "link_to_page" => BlockPayload::LinkToPage(take_payload(rest, &id, &block_type)?),
            "child_page" => BlockPayload::ChildPage(take_payload(rest, &id, &block_type)?),
            "child_database" => {
                BlockPayload::ChildDatabase(take_payload(rest, &id, &block_type)?)
            }
            "table" => BlockPayload::Table(take_payload(rest, &id, &block_type)?),
            "table_row" => BlockPayload::TableRow(take_payload(rest, &id, &block_type)?),
            "column_list" => BlockPayload::ColumnList,
            "column" => BlockPayload::Column,
            "synced_block" => BlockPayload::SyncedBlock(take_payload(rest, &id, &block_type)?),
            "template" => BlockPayload::Template(take_payload(rest, &id, &block_type)?),
            _ => BlockPayload::Unsupported {
                block_type: block_type.clone(),
            },
        };

        Ok(Block {
            common: BlockCommon {
                id,
                has_children,
                archived,
                parent,
            },
            payload,
        })
    }

    pub fn id(&self) -> &NodeId {
        &self.common.id
    }

    pub fn has_children(&self) -> bool {
        self.common.has_children
    }

    /// The wire name of this block's type.
    pub fn block_type(&self) -> &str {
        match &self.payload {
            BlockPayload::Paragraph(_) => "paragraph",
            BlockPayload::Heading1(_) => "heading_1",
            BlockPayload::Heading2(_) => "heading_2",
            BlockPayload::Heading3(_) => "heading_3",
            BlockPayload::BulletedListItem(_) => "bulleted_list_item",
            BlockPayload::NumberedListItem(_) => "numbered_list_item",
            BlockPayload::ToDo(_) => "to_do",
            BlockPayload::Toggle(_) => "toggle",
            BlockPayload::Quote(_) => "quote",
            BlockPayload::Callout(_) => "callout",
            BlockPayload::Code(_) => "code",
            BlockPayload::Equation(_) => "equation",
            BlockPayload::Divider => "divider",
            BlockPayload::Breadcrumb => "breadcrumb",
            BlockPayload::TableOfContents => "table_of_contents",
            BlockPayload::Image(_) => "image",
            BlockPayload::Video(_) => "video",
            BlockPayload::Audio(_) => "audio",
            BlockPayload::File(_) => "file",
            BlockPayload::Pdf(_) => "pdf",
            BlockPayload::Bookmark(_) => "bookmark",
            BlockPayload::Embed(_) => "embed",
            BlockPayload::LinkPreview(_) => "link_preview",
            BlockPayload::LinkToPage(_) => "link_to_page",
            BlockPayload::ChildPage(_) => "child_page",
            BlockPayload::ChildDatabase(_) => "child_database",
            BlockPayload::Table(_) => "table",
            BlockPayload::TableRow(_) => "table_row",
            BlockPayload::ColumnList => "column_list",
            BlockPayload::Column => "column",
            BlockPayload::SyncedBlock(_) => "synced_block",
            BlockPayload::Template(_) => "template",
            BlockPayload::Unsupported { block_type } => block_type,
        }
    }

    pub fn is_child_page(&self) -> bool {
        matches!(self.payload, BlockPayload::ChildPage(_))
    }

    /// Whether this block is an inline database whose rows must be queried.
    pub fn has_inline_database(&self) -> bool {
        matches!(self.payload, BlockPayload::ChildDatabase(_))
    }

    /// The file carried by a media block.
    pub fn attachment(&self) -> Option<(AttachmentKind, &FilePayload)> {
        match &self.payload {
            BlockPayload::File(file) => Some((AttachmentKind::File, file)),
            BlockPayload::Image(file) => Some((AttachmentKind::Image, file)),
            BlockPayload::Video(file) => Some((AttachmentKind::Video, file)),
            BlockPayload::Audio(file) => Some((AttachmentKind::Audio, file)),
            BlockPayload::Pdf(file) => Some((AttachmentKind::Pdf, file)),
            _ => None,
        }
    }

    /// Decides how a child block is processed, checked in order: sub-pages,
    /// inline databases, blocks with nested children, then media files.
    pub fn child_dispatch(&self) -> ChildDispatch {
        match &self.payload {
            BlockPayload::ChildPage(_) => ChildDispatch::Visit(NodeRef::block(self.id().clone())),
            BlockPayload::ChildDatabase(_) => {
                ChildDispatch::Visit(NodeRef::database(self.id().clone()))
            }
            _ if self.has_children() => ChildDispatch::Visit(NodeRef::block(self.id().clone())),
            _ => match self.attachment() {
                Some((kind, _)) => ChildDispatch::Download(kind),
                None => ChildDispatch::Leaf,
            },
        }
    }

    /// The text this block contributes on its own, without its children.
    pub fn plain_text(&self) -> String {
        match &self.payload {
            BlockPayload::Paragraph(c)
            | BlockPayload::BulletedListItem(c)
            | BlockPayload::NumberedListItem(c)
            | BlockPayload::Toggle(c)
            | BlockPayload::Quote(c)
            | BlockPayload::Template(c) => c.plain_text(),
            BlockPayload::Heading1(h) | BlockPayload::Heading2(h) | BlockPayload::Heading3(h) => {
                plain_text_of(&h.rich_text)
            }
            BlockPayload::ToDo(t) => plain_text_of(&t.rich_text),
            BlockPayload::Callout(c) => plain_text_of(&c.rich_text),
            BlockPayload::Code(c) => plain_text_of(&c.rich_text),
            BlockPayload::Equation(e) => e.expression.clone(),
            BlockPayload::Image(f)
            | BlockPayload::Video(f)
            | BlockPayload::Audio(f)
            | BlockPayload::File(f)
            | BlockPayload::Pdf(f) => plain_text_of(&f.caption),
            BlockPayload::Bookmark(l) | BlockPayload::Embed(l) => {
                let caption = plain_text_of(&l.caption);
                if caption.is_empty() {
                    l.url.clone()
                } else {
                    caption
                }
            }
            BlockPayload::LinkPreview(l) => l.url.clone(),
            BlockPayload::ChildPage(t) | BlockPayload::ChildDatabase(t) => t.title.clone(),
            BlockPayload::TableRow(row) => row
                .cells
                .iter()
                .map(|cell| plain_text_of(cell))
                .collect::<Vec<_>>()
                .join(" | "),
            BlockPayload::Divider
            | BlockPayload::Breadcrumb
            | BlockPayload::TableOfContents
            | BlockPayload::LinkToPage(_)
            | BlockPayload::Table(_)
            | BlockPayload::ColumnList
            | BlockPayload::Column
            | BlockPayload::SyncedBlock(_)
            | BlockPayload::Unsupported { .. } => String::new(),
        }
    }
}

fn take_payload<T: DeserializeOwned>(
    rest: &mut Map<String, Value>,
    id: &NodeId,
    block_type: &str,
) -> Result<T, AppError> {
    let value = rest.remove(block_type).ok_or_else(|| {
        classification_error(id.as_str(), format!("missing `{}` payload", block_type))
    })?;
    serde_json::from_value(value).map_err(|e| {
        classification_error(
            id.as_str(),
            format!("invalid `{}` payload: {}", block_type, e),
        )
    })
}

fn classification_error(id: &str, reason: String) -> AppError {
    AppError::Classification {
        id: id.to_string(),
        kind: "block".to_string(),
        reason,
    }
}

pub(super) fn id_hint(raw: &Value) -> &str {
    raw.get("id").and_then(Value::as_str).unwrap_or("<unknown>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw_block(id: &str, block_type: &str, has_children: bool, payload: Value) -> Value {
        let mut raw = json!({
            "object": "block",
            "id": id,
            "type": block_type,
            "has_children": has_children,
            "archived": false,
        });
        raw[block_type] = payload;
        raw
    }

    #[test]
    fn test_paragraph_text() {
        let raw = raw_block(
            "b1",
            "paragraph",
            false,
            json!({ "rich_text": [{ "type": "text", "plain_text": "Hello" }], "color": "default" }),
        );
        let block = Block::from_value(&raw).unwrap();
        assert_eq!(block.block_type(), "paragraph");
        assert_eq!(block.plain_text(), "Hello");
        assert_eq!(block.child_dispatch(), ChildDispatch::Leaf);
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let raw = raw_block("b2", "ai_block", false, json!({ "prompt": "x" }));
        let block = Block::from_value(&raw).unwrap();
        assert_eq!(
            block.payload,
            BlockPayload::Unsupported {
                block_type: "ai_block".to_string()
            }
        );
        assert_eq!(block.block_type(), "ai_block");
    }

    #[test]
    fn test_missing_payload_is_classification_error() {
        let raw = json!({ "object": "block", "id": "b3", "type": "code", "has_children": false });
        let err = Block::from_value(&raw).unwrap_err();
        assert_eq!(err.kind_name(), "Classification");
        assert!(err.to_string().contains("missing `code` payload"));
    }

    #[test]
    fn test_wrong_object_is_rejected() {
        let mut raw = raw_block("b4", "divider", false, json!({}));
        raw["object"] = json!("page");
        assert!(Block::from_value(&raw).is_err());
    }

    #[test]
    fn test_child_dispatch_order() {
        let page = raw_block("p1", "child_page", true, json!({ "title": "Notes" }));
        assert_eq!(
            Block::from_value(&page).unwrap().child_dispatch(),
            ChildDispatch::Visit(NodeRef::block("p1"))
        );

        let database = raw_block("d1", "child_database", false, json!({ "title": "Tasks" }));
        let database = Block::from_value(&database).unwrap();
        assert!(database.has_inline_database());
        assert_eq!(
            database.child_dispatch(),
            ChildDispatch::Visit(NodeRef::database("d1"))
        );

        let toggle = raw_block("t1", "toggle", true, json!({ "rich_text": [] }));
        assert_eq!(
            Block::from_value(&toggle).unwrap().child_dispatch(),
            ChildDispatch::Visit(NodeRef::block("t1"))
        );

        let pdf = raw_block(
            "f1",
            "pdf",
            false,
            json!({ "type": "file", "file": { "url": "https://files.example.com/report.pdf" } }),
        );
        assert_eq!(
            Block::from_value(&pdf).unwrap().child_dispatch(),
            ChildDispatch::Download(AttachmentKind::Pdf)
        );
    }

    #[test]
    fn test_external_image_has_no_hosted_url() {
        let raw = raw_block(
            "i1",
            "image",
            false,
            json!({ "type": "external", "external": { "url": "https://example.com/a.png" } }),
        );
        let block = Block::from_value(&raw).unwrap();
        let (kind, file) = block.attachment().unwrap();
        assert_eq!(kind, AttachmentKind::Image);
        assert_eq!(file.hosted_url(), None);
    }
}
