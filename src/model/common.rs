use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// Common fields for all blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockCommon {
    pub id: NodeId,
    pub has_children: bool,
    pub archived: bool,
    pub parent: Option<Parent>,
}

impl BlockCommon {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            has_children: false,
            archived: false,
            parent: None,
        }
    }

    pub fn with_children(mut self, has_children: bool) -> Self {
        self.has_children = has_children;
        self
    }
}

/// Parent reference of a block, page or database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Parent {
    #[serde(rename = "page_id")]
    Page { page_id: NodeId },
    #[serde(rename = "database_id")]
    Database { database_id: NodeId },
    #[serde(rename = "block_id")]
    Block { block_id: NodeId },
    #[serde(rename = "workspace")]
    Workspace,
    /// Parent kinds introduced after this client was written.
    #[serde(other)]
    Other,
}

/// One run of rich text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextItem {
    /// `text`, `mention` or `equation`.
    #[serde(rename = "type", default = "default_rich_text_type")]
    pub text_type: String,
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

fn default_rich_text_type() -> String {
    "text".to_string()
}

impl RichTextItem {
    pub fn plain_text(text: impl Into<String>) -> Self {
        Self {
            text_type: default_rich_text_type(),
            plain_text: text.into(),
            href: None,
            annotations: Annotations::default(),
        }
    }
}

/// Concatenates the plain text of a run of rich text.
pub fn plain_text_of(items: &[RichTextItem]) -> String {
    items.iter().map(|item| item.plain_text.as_str()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: String,
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            strikethrough: false,
            underline: false,
            code: false,
            color: "default".to_string(),
        }
    }
}

/// Where a file's bytes live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FileObject {
    /// Linked from elsewhere on the web; never downloaded.
    #[serde(rename = "external")]
    External { external: ExternalFile },
    /// Hosted by Notion behind a time-limited signed URL.
    #[serde(rename = "file")]
    File { file: NotionFile },
    /// Uploaded through the file upload API and not yet attached.
    #[serde(rename = "file_upload")]
    FileUpload { file_upload: FileUploadRef },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalFile {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotionFile {
    pub url: String,
    #[serde(default)]
    pub expiry_time: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUploadRef {
    pub id: String,
}

/// File payload shared by image, video, audio, file and pdf blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePayload {
    #[serde(flatten)]
    pub source: FileObject,
    #[serde(default)]
    pub caption: Vec<RichTextItem>,
    #[serde(default)]
    pub name: Option<String>,
}

impl FilePayload {
    /// The signed URL of a Notion-hosted file; `None` for every other source.
    pub fn hosted_url(&self) -> Option<&str> {
        match &self.source {
            FileObject::File { file } => Some(file.url.as_str()),
            FileObject::External { .. } | FileObject::FileUpload { .. } => None,
        }
    }
}

/// Icon of a page, database or callout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Icon {
    #[serde(rename = "emoji")]
    Emoji { emoji: String },
    #[serde(rename = "external")]
    External { external: ExternalFile },
    #[serde(rename = "file")]
    File { file: NotionFile },
    #[serde(other)]
    Other,
}
