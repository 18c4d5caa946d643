// src/api/pagination.rs
//! Cursor pagination over list endpoints.

use super::responses::PaginatedResponse;
use super::NotionRepository;
use crate::error::AppError;
use crate::types::NodeId;
use serde_json::Value;

/// Everything a paginated listing returned, in remote order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaginationResult {
    pub items: Vec<Value>,
    pub pages_fetched: u32,
}

/// Follows `next_cursor` until the listing reports no more pages.
///
/// Each page's results are moved into the accumulator, so no item aliases
/// a previously decoded response.
pub async fn fetch_all_pages<F, Fut>(mut fetch_fn: F) -> Result<PaginationResult, AppError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: std::future::Future<Output = Result<PaginatedResponse, AppError>>,
{
    let mut result = PaginationResult::default();
    let mut cursor = None;

    loop {
        let response = fetch_fn(cursor.take()).await?;
        result.pages_fetched += 1;
        result.items.extend(response.results);

        match response.next_cursor {
            Some(next) if response.has_more => cursor = Some(next),
            _ => break,
        }
    }

    Ok(result)
}

/// All child blocks of `block_id`.
pub async fn all_block_children(
    repo: &dyn NotionRepository,
    block_id: &NodeId,
) -> Result<PaginationResult, AppError> {
    fetch_all_pages(move |cursor| async move {
        repo.retrieve_children_page(block_id, cursor.as_deref()).await
    })
    .await
}

/// All rows of `database_id`.
pub async fn all_database_rows(
    repo: &dyn NotionRepository,
    database_id: &NodeId,
) -> Result<PaginationResult, AppError> {
    fetch_all_pages(move |cursor| async move {
        repo.query_rows_page(database_id, cursor.as_deref()).await
    })
    .await
}
