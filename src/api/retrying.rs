// src/api/retrying.rs
//! Decorator that paces and retries every call of an inner repository.

use super::responses::PaginatedResponse;
use super::NotionRepository;
use crate::algebras::EventSink;
use crate::error::AppError;
use crate::error_recovery::{retry_with_backoff, RetryPolicy};
use crate::types::NodeId;
use serde_json::Value;
use std::sync::Arc;

/// Wraps a repository so each logical operation runs under a [`RetryPolicy`].
///
/// A retry re-issues the whole operation; for paginated listings that means
/// one page request, since pagination drives one call per cursor.
pub struct RetryingClient {
    inner: Arc<dyn NotionRepository>,
    policy: RetryPolicy,
    events: Arc<dyn EventSink>,
}

impl RetryingClient {
    pub fn new(
        inner: Arc<dyn NotionRepository>,
        policy: RetryPolicy,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            inner,
            policy,
            events,
        }
    }
}

#[async_trait::async_trait]
impl NotionRepository for RetryingClient {
    async fn retrieve_block(&self, id: &NodeId) -> Result<Value, AppError> {
        retry_with_backoff(&self.policy, self.events.as_ref(), "retrieve_block", || {
            self.inner.retrieve_block(id)
        })
        .await
    }

    async fn retrieve_page(&self, id: &NodeId) -> Result<Value, AppError> {
        retry_with_backoff(&self.policy, self.events.as_ref(), "retrieve_page", || {
            self.inner.retrieve_page(id)
        })
        .await
    }

    async fn retrieve_database(&self, id: &NodeId) -> Result<Value, AppError> {
        retry_with_backoff(&self.policy, self.events.as_ref(), "retrieve_database", || {
            self.inner.retrieve_database(id)
        })
        .await
    }

    async fn retrieve_children_page(
        &self,
        block_id: &NodeId,
        cursor: Option<&str>,
    ) -> Result<PaginatedResponse, AppError> {
        retry_with_backoff(
            &self.policy,
            self.events.as_ref(),
            "retrieve_block_children",
            || self.inner.retrieve_children_page(block_id, cursor),
        )
        .await
    }

    async fn query_rows_page(
        &self,
        database_id: &NodeId,
        cursor: Option<&str>,
    ) -> Result<PaginatedResponse, AppError> {
        retry_with_backoff(&self.policy, self.events.as_ref(), "query_database", || {
            self.inner.query_rows_page(database_id, cursor)
        })
        .await
    }
}
