// src/output/writer.rs
//! Persists raw API payloads as snapshot files.
//!
//! This module and the attachment downloader are the only places where
//! crawl output touches the filesystem.

use super::paths::{partial_path, snapshot_file_name};
use super::types::{ChildListType, SnapshotFacet};
use crate::algebras::EventSink;
use crate::error::{persistence_error, AppError};
use crate::types::NodeRef;
use log::Level;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes one JSON file per (node, facet) under a base directory.
pub struct SnapshotWriter {
    events: Arc<dyn EventSink>,
}

impl SnapshotWriter {
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self { events }
    }

    /// Writes `payload` as pretty JSON to `<base>/<kind>_<id>_<facet>.json`,
    /// replacing any earlier snapshot of the same facet.
    pub fn write(
        &self,
        base: &Path,
        node: &NodeRef,
        facet: SnapshotFacet,
        payload: &Value,
    ) -> Result<PathBuf, AppError> {
        let path = base.join(snapshot_file_name(node.kind, &node.id, facet));
        let body = serde_json::to_vec_pretty(payload)?;

        write_file(&path, &body)?;

        self.events.record(
            Level::Debug,
            "Saved snapshot",
            &[
                ("id", node.id.to_string()),
                ("kind", node.kind.to_string()),
                ("facet", facet.to_string()),
                ("path", path.display().to_string()),
                ("bytes", body.len().to_string()),
            ],
        );
        Ok(path)
    }

    /// Writes every accumulated child of `parent` as a single list snapshot.
    pub fn write_children(
        &self,
        base: &Path,
        parent: &NodeRef,
        list_type: ChildListType,
        items: &[Value],
    ) -> Result<PathBuf, AppError> {
        let envelope = json!({
            "object": "list",
            "results": items,
            "has_more": false,
            "type": list_type.as_str(),
        });
        self.write(base, parent, SnapshotFacet::Children, &envelope)
    }
}

/// Writes `body` to a sibling temp file, then renames it over `path`.
fn write_file(path: &Path, body: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| persistence_error(parent, &e))?;
    }

    let temp = partial_path(path);
    fs::write(&temp, body).map_err(|e| persistence_error(&temp, &e))?;
    fs::rename(&temp, path).map_err(|e| {
        let _ = fs::remove_file(&temp);
        persistence_error(path, &e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebras::MemorySink;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(Arc::new(MemorySink::new()));
        let base = dir.path().join("raw").join("block_a");

        let path = writer
            .write(
                &base,
                &NodeRef::block("b1"),
                SnapshotFacet::Main,
                &json!({ "object": "block", "id": "b1" }),
            )
            .unwrap();

        assert_eq!(path, base.join("block_b1_main.json"));
        let written: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["id"], "b1");
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_children_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(Arc::new(MemorySink::new()));

        let path = writer
            .write_children(
                dir.path(),
                &NodeRef::database("d1"),
                ChildListType::Page,
                &[json!({ "id": "r1" }), json!({ "id": "r2" })],
            )
            .unwrap();

        let written: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            written,
            json!({
                "object": "list",
                "results": [{ "id": "r1" }, { "id": "r2" }],
                "has_more": false,
                "type": "page"
            })
        );
        assert!(path.ends_with("database_d1_children.json"));
    }

    #[test]
    fn test_unwritable_base_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        fs::write(&blocker, b"not a directory").unwrap();
        let writer = SnapshotWriter::new(Arc::new(MemorySink::new()));

        let err = writer
            .write(&blocker, &NodeRef::page("p1"), SnapshotFacet::Main, &json!({}))
            .unwrap_err();
        assert_eq!(err.kind_name(), "Persistence");
    }
}
