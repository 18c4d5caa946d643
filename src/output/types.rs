use std::fmt;

/// Which facet of a node a snapshot file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotFacet {
    /// The node object itself.
    Main,
    /// The page object behind a `child_page` block.
    PageData,
    /// Every child block or database row, as one list.
    Children,
}

impl SnapshotFacet {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotFacet::Main => "main",
            SnapshotFacet::PageData => "page_data",
            SnapshotFacet::Children => "children",
        }
    }
}

impl fmt::Display for SnapshotFacet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The object type named in a children snapshot envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildListType {
    /// Block children.
    Block,
    /// Database rows.
    Page,
}

impl ChildListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildListType::Block => "block",
            ChildListType::Page => "page",
        }
    }
}
