use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Remote-assigned node identifier.
///
/// Ids are opaque: children discovered during traversal keep exactly the
/// form the API returned them in, since snapshot paths are derived from it.
/// Only operator-supplied roots go through [`NodeId::parse_root`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse an operator-supplied root: a dashed or dashless UUID, or a
    /// Notion URL ending in one. Normalizes to the hyphenated form the API
    /// uses for ids in responses.
    pub fn parse_root(input: &str) -> Result<Self, ValidationError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ValidationError::EmptyField("root entity id"));
        }

        let candidate = if input.starts_with("http://") || input.starts_with("https://") {
            extract_id_from_url(input).ok_or_else(|| {
                ValidationError::InvalidId(format!("Could not extract ID from URL: {}", input))
            })?
        } else {
            input
        };

        let uuid = Uuid::parse_str(candidate).map_err(|_| {
            ValidationError::InvalidId(format!("Expected UUID, got: {}", candidate))
        })?;
        Ok(Self(uuid.as_hyphenated().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Extract the trailing id from a Notion URL.
fn extract_id_from_url(url: &str) -> Option<&str> {
    let url = url.trim_end_matches('/');
    let url = url.split(['?', '#']).next().unwrap_or(url);

    // Format: https://www.notion.so/[workspace]/[title]-[id]
    if let Some(pos) = url.rfind('-') {
        let potential_id = &url[pos + 1..];
        if potential_id.len() == 32 {
            return Some(potential_id);
        }
    }

    // Format: https://www.notion.so/[id]
    if let Some(pos) = url.rfind('/') {
        let potential_id = &url[pos + 1..];
        if potential_id.len() == 32 || (potential_id.len() == 36 && potential_id.contains('-')) {
            return Some(potential_id);
        }
    }

    None
}

/// The three node kinds the workspace API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Block,
    Page,
    Database,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Block => "block",
            NodeKind::Page => "page",
            NodeKind::Database => "database",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(NodeKind::Block),
            "page" => Ok(NodeKind::Page),
            "database" => Ok(NodeKind::Database),
            other => Err(ValidationError::InvalidKind(other.to_string())),
        }
    }
}

/// A unit of crawl work: which node, and which endpoint family to fetch it from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl NodeRef {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn block(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Block)
    }

    pub fn page(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Page)
    }

    pub fn database(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Database)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}
