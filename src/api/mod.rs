// src/api/mod.rs
//! Notion API interaction, the ability to retrieve raw nodes from a workspace.
//!
//! Business logic depends on [`NotionRepository`], never on HTTP details.
//! [`NotionHttpClient`] speaks the REST API; [`RetryingClient`] decorates any
//! repository with pacing and exponential backoff.

pub mod client;
pub mod pagination;
pub mod responses;
pub mod retrying;

use crate::error::AppError;
use crate::types::{NodeId, NodeKind, NodeRef};
use serde_json::Value;

pub use client::NotionHttpClient;
pub use pagination::{all_block_children, all_database_rows, fetch_all_pages, PaginationResult};
pub use responses::PaginatedResponse;
pub use retrying::RetryingClient;

/// The ability to retrieve content from a Notion workspace.
///
/// Every method returns the raw JSON exactly as the API produced it, so
/// callers can persist it untouched and classify it separately.
#[async_trait::async_trait]
pub trait NotionRepository: Send + Sync {
    async fn retrieve_block(&self, id: &NodeId) -> Result<Value, AppError>;
    async fn retrieve_page(&self, id: &NodeId) -> Result<Value, AppError>;
    async fn retrieve_database(&self, id: &NodeId) -> Result<Value, AppError>;

    /// One page of a block's children, starting at `cursor`.
    async fn retrieve_children_page(
        &self,
        block_id: &NodeId,
        cursor: Option<&str>,
    ) -> Result<PaginatedResponse, AppError>;

    /// One page of a database's rows, starting at `cursor`.
    async fn query_rows_page(
        &self,
        database_id: &NodeId,
        cursor: Option<&str>,
    ) -> Result<PaginatedResponse, AppError>;

    /// Fetches a node from the endpoint family matching its kind.
    async fn retrieve(&self, node: &NodeRef) -> Result<Value, AppError> {
        match node.kind {
            NodeKind::Block => self.retrieve_block(&node.id).await,
            NodeKind::Page => self.retrieve_page(&node.id).await,
            NodeKind::Database => self.retrieve_database(&node.id).await,
        }
    }
}
