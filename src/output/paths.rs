// src/output/paths.rs
//! Pure functions for path calculations and filename generation.
//!
//! This module handles all path-related operations without
//! performing any I/O operations.

use super::types::SnapshotFacet;
use crate::constants::PARTIAL_FILE_SUFFIX;
use crate::model::AttachmentKind;
use crate::types::{NodeId, NodeKind};
use std::path::{Component, Path, PathBuf};

/// `<kind>_<id>_<facet>.json`
pub fn snapshot_file_name(kind: NodeKind, id: &NodeId, facet: SnapshotFacet) -> String {
    format!("{}_{}_{}.json", kind, sanitize_filename(id.as_str()), facet)
}

/// Directory holding the snapshots of a container's children.
pub fn child_dir(base: &Path, kind: NodeKind, id: &NodeId) -> PathBuf {
    base.join(format!("{}_{}", kind, sanitize_filename(id.as_str())))
}

/// Local name for a downloaded file: the last segment of the URL path, or
/// `<id>.<type>` when the URL has none.
pub fn attachment_file_name(url: &str, id: &NodeId, kind: AttachmentKind) -> String {
    let from_url = url::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(sanitize_filename)
    });

    match from_url {
        Some(name) if name != "unnamed" => name,
        _ => format!("{}.{}", sanitize_filename(id.as_str()), kind),
    }
}

/// Sibling path used while a file is being written.
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_FILE_SUFFIX);
    target.with_file_name(name)
}

/// Sanitizes a string to be safe for use as a filename.
pub fn sanitize_filename(name: &str) -> String {
    let mut safe_name = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>();

    safe_name = safe_name.trim().trim_matches('.').to_string();

    if safe_name.len() > 200 {
        let mut cut = 200;
        while !safe_name.is_char_boundary(cut) {
            cut -= 1;
        }
        safe_name.truncate(cut);
    }

    if safe_name.is_empty() {
        safe_name = "unnamed".to_string();
    }

    safe_name
}

/// `dir` relative to `root`, with forward slashes; empty when they match.
pub fn relative_location(root: &Path, dir: &Path) -> String {
    pathdiff::diff_paths(dir, root)
        .map(|relative| relative.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}

/// Resolves a recorded location under `root`. Locations that would escape
/// `root` resolve to `root` itself.
pub fn resolve_location(root: &Path, location: &str) -> PathBuf {
    let relative = Path::new(location);
    let stays_inside = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if location.is_empty() || !stays_inside {
        root.to_path_buf()
    } else {
        root.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_names() {
        let id = NodeId::new("1b2c");
        assert_eq!(
            snapshot_file_name(NodeKind::Block, &id, SnapshotFacet::Main),
            "block_1b2c_main.json"
        );
        assert_eq!(
            snapshot_file_name(NodeKind::Block, &id, SnapshotFacet::PageData),
            "block_1b2c_page_data.json"
        );
        assert_eq!(
            child_dir(Path::new("raw"), NodeKind::Database, &id),
            PathBuf::from("raw/database_1b2c")
        );
    }

    #[test]
    fn test_attachment_name_from_url() {
        let id = NodeId::new("f1");
        assert_eq!(
            attachment_file_name(
                "https://files.example.com/secure/abc/report.pdf?X-Amz-Expires=3600",
                &id,
                AttachmentKind::Pdf
            ),
            "report.pdf"
        );
        assert_eq!(
            attachment_file_name("https://files.example.com/", &id, AttachmentKind::Image),
            "f1.image"
        );
        assert_eq!(
            attachment_file_name("not a url", &id, AttachmentKind::File),
            "f1.file"
        );
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("raw/block_b/report.pdf")),
            PathBuf::from("raw/block_b/report.pdf.part")
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b:c"), "a_b_c");
        assert_eq!(sanitize_filename("..."), "unnamed");
    }

    #[test]
    fn test_location_round_trip() {
        let root = Path::new("/data/x/raw");
        let dir = root.join("block_a").join("database_b");
        let location = relative_location(root, &dir);
        assert_eq!(location, "block_a/database_b");
        assert_eq!(resolve_location(root, &location), dir);
        assert_eq!(relative_location(root, root), "");
        assert_eq!(resolve_location(root, ""), root);
        assert_eq!(resolve_location(root, "../../etc"), root);
    }
}
