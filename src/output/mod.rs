// src/output/mod.rs
//! Crawl output: snapshot files, attachment downloads, and the pure path
//! rules that lay them out on disk.

mod attachments;
pub mod paths;
mod types;
mod writer;

pub use attachments::{AttachmentDownloader, DownloadedFile};
pub use paths::{child_dir, relative_location, resolve_location, snapshot_file_name};
pub use types::{ChildListType, SnapshotFacet};
pub use writer::SnapshotWriter;
