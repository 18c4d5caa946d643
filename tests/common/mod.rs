// tests/common/mod.rs
//! In-memory workspace and fixtures shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use notion_puller::error::NotionErrorCode;
use notion_puller::{
    AppError, Crawler, EventSink, MemorySink, NodeId, NotionRepository, PaginatedResponse,
    ProgressStore,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How a scripted failure behaves.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// 404 on every attempt.
    Missing,
    /// 503 for the next `n` attempts, then success.
    Transient(u32),
    /// 401 on every attempt.
    Unauthorized,
}

/// A Notion workspace held in memory.
///
/// Every call is logged as `"<operation>:<id>"` so tests can assert on
/// exactly what was fetched.
#[derive(Default)]
pub struct FakeNotion {
    blocks: HashMap<String, Value>,
    pages: HashMap<String, Value>,
    databases: HashMap<String, Value>,
    children: HashMap<String, Vec<Value>>,
    rows: HashMap<String, Vec<Value>>,
    page_size: Option<usize>,
    failures: Mutex<HashMap<String, Failure>>,
    calls: Mutex<Vec<String>>,
}

impl FakeNotion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a block object and, for child pages, the matching page.
    pub fn block(mut self, raw: Value) -> Self {
        let id = raw["id"].as_str().unwrap_or_default().to_string();
        if raw["type"] == "child_page" {
            let title = raw["child_page"]["title"].as_str().unwrap_or_default();
            self.pages.insert(id.clone(), page(&id, title));
        }
        self.blocks.insert(id, raw);
        self
    }

    pub fn page(mut self, raw: Value) -> Self {
        let id = raw["id"].as_str().unwrap_or_default().to_string();
        self.pages.insert(id, raw);
        self
    }

    pub fn database(mut self, raw: Value) -> Self {
        let id = raw["id"].as_str().unwrap_or_default().to_string();
        self.databases.insert(id, raw);
        self
    }

    pub fn children(mut self, parent: &str, items: Vec<Value>) -> Self {
        self.children.insert(parent.to_string(), items);
        self
    }

    pub fn rows(mut self, database: &str, items: Vec<Value>) -> Self {
        self.rows.insert(database.to_string(), items);
        self
    }

    /// Splits every listing into pages of `size` items.
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn failing(self, id: &str, failure: Failure) -> Self {
        self.failures.lock().insert(id.to_string(), failure);
        self
    }

    /// Lets `id` succeed from now on.
    pub fn heal(&self, id: &str) {
        self.failures.lock().remove(id);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Calls whose target id is `id`.
    pub fn calls_for(&self, id: &str) -> Vec<String> {
        let suffix = format!(":{}", id);
        self.calls()
            .into_iter()
            .filter(|call| call.ends_with(&suffix))
            .collect()
    }

    /// Logs the call and yields once, so concurrent traversals interleave
    /// the way they would over a network.
    async fn log_call(&self, operation: &str, id: &NodeId) {
        self.calls.lock().push(format!("{}:{}", operation, id));
        tokio::task::yield_now().await;
    }

    /// Logs the call and applies any scripted failure.
    async fn enter(&self, operation: &str, id: &NodeId) -> Result<(), AppError> {
        self.log_call(operation, id).await;

        let mut failures = self.failures.lock();
        let Some(failure) = failures.get_mut(id.as_str()) else {
            return Ok(());
        };
        match failure {
            Failure::Missing => Err(service_error(NotionErrorCode::ObjectNotFound, 404)),
            Failure::Unauthorized => Err(service_error(NotionErrorCode::Unauthorized, 401)),
            Failure::Transient(0) => Ok(()),
            Failure::Transient(remaining) => {
                *remaining -= 1;
                Err(service_error(NotionErrorCode::ServiceUnavailable, 503))
            }
        }
    }

    fn lookup(map: &HashMap<String, Value>, id: &NodeId) -> Result<Value, AppError> {
        map.get(id.as_str())
            .cloned()
            .ok_or_else(|| service_error(NotionErrorCode::ObjectNotFound, 404))
    }

    fn paginate(&self, items: Option<&Vec<Value>>, cursor: Option<&str>) -> PaginatedResponse {
        let items = items.cloned().unwrap_or_default();
        let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let size = self.page_size.unwrap_or(items.len().max(1));
        let end = (start + size).min(items.len());
        let slice = items[start.min(end)..end].to_vec();
        if end < items.len() {
            PaginatedResponse::partial(slice, end.to_string())
        } else {
            PaginatedResponse::last(slice)
        }
    }
}

#[async_trait]
impl NotionRepository for FakeNotion {
    async fn retrieve_block(&self, id: &NodeId) -> Result<Value, AppError> {
        self.enter("retrieve_block", id).await?;
        Self::lookup(&self.blocks, id)
    }

    async fn retrieve_page(&self, id: &NodeId) -> Result<Value, AppError> {
        self.enter("retrieve_page", id).await?;
        Self::lookup(&self.pages, id)
    }

    async fn retrieve_database(&self, id: &NodeId) -> Result<Value, AppError> {
        self.enter("retrieve_database", id).await?;
        Self::lookup(&self.databases, id)
    }

    async fn retrieve_children_page(
        &self,
        block_id: &NodeId,
        cursor: Option<&str>,
    ) -> Result<PaginatedResponse, AppError> {
        self.log_call("list_children", block_id).await;
        Ok(self.paginate(self.children.get(block_id.as_str()), cursor))
    }

    async fn query_rows_page(
        &self,
        database_id: &NodeId,
        cursor: Option<&str>,
    ) -> Result<PaginatedResponse, AppError> {
        self.log_call("query_rows", database_id).await;
        Ok(self.paginate(self.rows.get(database_id.as_str()), cursor))
    }
}

pub fn service_error(code: NotionErrorCode, status: u16) -> AppError {
    AppError::NotionService {
        message: format!("scripted {}", code),
        code,
        status,
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn raw_block(id: &str, block_type: &str, has_children: bool, payload: Value) -> Value {
    let mut raw = json!({
        "object": "block",
        "id": id,
        "type": block_type,
        "has_children": has_children,
        "archived": false,
    });
    raw[block_type] = payload;
    raw
}

pub fn paragraph(id: &str, text: &str) -> Value {
    raw_block(
        id,
        "paragraph",
        false,
        json!({ "rich_text": [{ "type": "text", "plain_text": text }], "color": "default" }),
    )
}

pub fn toggle(id: &str, has_children: bool) -> Value {
    raw_block(id, "toggle", has_children, json!({ "rich_text": [] }))
}

pub fn child_page(id: &str, title: &str) -> Value {
    raw_block(id, "child_page", true, json!({ "title": title }))
}

pub fn child_database(id: &str, title: &str) -> Value {
    raw_block(id, "child_database", false, json!({ "title": title }))
}

pub fn hosted_file(id: &str, block_type: &str, url: &str) -> Value {
    raw_block(
        id,
        block_type,
        false,
        json!({ "caption": [], "type": "file", "file": { "url": url, "expiry_time": null } }),
    )
}

pub fn external_file(id: &str, block_type: &str, url: &str) -> Value {
    raw_block(
        id,
        block_type,
        false,
        json!({ "caption": [], "type": "external", "external": { "url": url } }),
    )
}

pub fn page(id: &str, title: &str) -> Value {
    json!({
        "object": "page",
        "id": id,
        "url": format!("https://www.notion.so/{}", id),
        "archived": false,
        "properties": {
            "title": { "id": "title", "type": "title", "title": [
                { "type": "text", "plain_text": title }
            ]}
        }
    })
}

pub fn database(id: &str, title: &str) -> Value {
    json!({
        "object": "database",
        "id": id,
        "title": [{ "type": "text", "plain_text": title }],
        "is_inline": true,
        "properties": {}
    })
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A crawler over a [`FakeNotion`] writing into a scratch directory.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub notion: Arc<FakeNotion>,
    pub events: Arc<MemorySink>,
    pub crawler: Crawler,
}

impl Harness {
    pub fn new(notion: FakeNotion) -> Self {
        let dir = tempfile::tempdir().expect("scratch directory");
        Self::in_dir(dir, Arc::new(notion))
    }

    /// A fresh crawler (and freshly loaded store) over an existing directory.
    pub fn in_dir(dir: tempfile::TempDir, notion: Arc<FakeNotion>) -> Self {
        let client: Arc<dyn NotionRepository> = notion.clone();
        Self::with_client(dir, notion, client)
    }

    /// Like [`Harness::in_dir`] but crawling through `client`, which
    /// usually wraps `notion`.
    pub fn with_client(
        dir: tempfile::TempDir,
        notion: Arc<FakeNotion>,
        client: Arc<dyn NotionRepository>,
    ) -> Self {
        let events = Arc::new(MemorySink::new());
        let sink: Arc<dyn EventSink> = events.clone();
        let store = ProgressStore::load(dir.path().join("pull_state.json"), sink.clone());
        let crawler = Crawler::new(client, Arc::new(store), sink, dir.path().join("raw"))
            .expect("crawler");
        Self {
            dir,
            notion,
            events,
            crawler,
        }
    }

    /// Drops the crawler and loads everything again from disk.
    pub fn restart(self) -> Self {
        Self::in_dir(self.dir, self.notion)
    }

    pub fn raw(&self) -> PathBuf {
        self.dir.path().join("raw")
    }

    pub fn read_json(&self, relative: &str) -> Value {
        read_json(&self.raw().join(relative))
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.raw().join(relative).exists()
    }
}

pub fn read_json(path: &Path) -> Value {
    let body = std::fs::read(path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e));
    serde_json::from_slice(&body).expect("snapshot is JSON")
}
