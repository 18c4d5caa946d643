// src/lib.rs
//! notion-puller library. Mirrors a Notion subtree into local JSON snapshots.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `NotionErrorCode`, `ValidationError`
//! - **Configuration**: `PullConfig`, `CommandLineInput`
//! - **Domain model**: `Node`, `Block`, `BlockPayload`, `Page`, `Database`
//! - **Domain types**: `NodeId`, `NodeKind`, `NodeRef`, `ApiKey`
//! - **API client**: `NotionRepository`, `NotionHttpClient`, `RetryingClient`
//! - **Crawl**: `Crawler`, `ProgressStore`, `PullSummary`

pub mod algebras;
pub mod api;
pub mod config;
pub mod constants;
pub mod crawler;
pub mod error;
pub mod error_recovery;
pub mod model;
pub mod output;
pub mod state;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, NotionErrorCode};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, LogFormat, PullConfig, RunMode};

// --- Domain Model ---
pub use crate::model::{
    AttachmentKind, Block, BlockPayload, ChildDispatch, Database, FilePayload, Node, Page,
};

// --- Domain Types ---
pub use crate::types::{ApiKey, NodeId, NodeKind, NodeRef};

// --- API Client ---
pub use crate::api::{NotionHttpClient, NotionRepository, PaginatedResponse, RetryingClient};
pub use crate::error_recovery::RetryPolicy;

// --- Crawl ---
pub use crate::crawler::{Crawler, PullSummary, VisitOutcome};
pub use crate::state::{FailedNode, ProgressStore};

// --- Algebras (Capability Traits) ---
pub use crate::algebras::{EventSink, LogSink, MemorySink};
