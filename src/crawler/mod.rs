//! Resumable depth-first crawl of a Notion subtree.
//!
//! Traversal runs off an explicit stack of [`Step`]s instead of recursion.
//! A node's `Complete` step is pushed beneath its children, so it is only
//! marked completed once its whole subtree has drained; an interrupted run
//! never leaves a completed parent with unvisited children.

mod summary;

pub use summary::PullSummary;

use crate::algebras::EventSink;
use crate::api::{all_block_children, all_database_rows, NotionRepository};
use crate::constants::DEFAULT_MAX_CONCURRENT;
use crate::error::{persistence_error, AppError};
use crate::model::{Block, ChildDispatch, Node, Page};
use crate::output::{
    child_dir, relative_location, resolve_location, AttachmentDownloader, ChildListType,
    SnapshotFacet, SnapshotWriter,
};
use crate::state::ProgressStore;
use crate::types::{NodeId, NodeKind, NodeRef};
use futures::{StreamExt, TryStreamExt};
use log::Level;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How a [`Crawler::visit`] call ended for the node it was given.
#[derive(Debug, Clone, PartialEq)]
pub enum VisitOutcome {
    /// Already recorded as completed; nothing was fetched.
    AlreadyCompleted,
    /// Already scheduled by another traversal of the same operation.
    AlreadyClaimed,
    /// The node and its subtree were processed.
    Completed,
    /// The node itself failed with this `"<cause-type>: <message>"`.
    Failed(String),
}

/// Which listing endpoint feeds a children snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildSource {
    Blocks,
    DatabaseRows,
}

/// One unit of pending traversal work.
enum Step {
    Visit {
        node: NodeRef,
        base: PathBuf,
    },
    ListChildren {
        owner: NodeRef,
        source: ChildSource,
        base: PathBuf,
    },
    Download {
        block: Block,
        dir: PathBuf,
    },
    Complete {
        node: NodeRef,
    },
}

/// Ids scheduled for a visit, shared by every traversal of one operation
/// so concurrent traversals never process the same node twice.
type Claims = Mutex<HashSet<NodeId>>;

/// Per-traversal bookkeeping.
#[derive(Default)]
struct Traversal {
    /// Nodes whose own processing failed during this traversal.
    failed: HashMap<NodeId, String>,
}

pub struct Crawler {
    client: Arc<dyn NotionRepository>,
    store: Arc<ProgressStore>,
    writer: SnapshotWriter,
    downloader: AttachmentDownloader,
    events: Arc<dyn EventSink>,
    raw_dir: PathBuf,
    max_concurrent: usize,
}

impl Crawler {
    pub fn new(
        client: Arc<dyn NotionRepository>,
        store: Arc<ProgressStore>,
        events: Arc<dyn EventSink>,
        raw_dir: impl Into<PathBuf>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            client,
            store,
            writer: SnapshotWriter::new(events.clone()),
            downloader: AttachmentDownloader::new(events.clone())?,
            events,
            raw_dir: raw_dir.into(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        })
    }

    /// Bounds how many failed subtrees [`Crawler::pull_failed_only`] retries at once.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Pulls `root` and everything beneath it into the raw directory.
    ///
    /// Failures below the root are recorded and skipped. The run errors only
    /// when the root itself cannot be processed or progress cannot be saved.
    pub async fn run_from_root(&self, root: &NodeRef) -> Result<PullSummary, AppError> {
        self.store.set_metadata("root_id", json!(root.id.as_str()))?;
        self.store.set_metadata("root_kind", json!(root.kind.as_str()))?;
        self.store
            .set_metadata("last_run_started", json!(chrono::Utc::now().to_rfc3339()))?;
        self.events.record(
            Level::Info,
            "Starting pull operation",
            &[
                ("root_id", root.id.to_string()),
                ("kind", root.kind.to_string()),
            ],
        );

        let outcome = self.visit(root, &self.raw_dir).await?;

        self.store
            .set_metadata("last_run_finished", json!(chrono::Utc::now().to_rfc3339()))?;
        let summary = self.summary();

        if let VisitOutcome::Failed(cause) = outcome {
            self.events.record(
                Level::Error,
                "Pull operation failed",
                &[("root_id", root.id.to_string()), ("error", cause.clone())],
            );
            return Err(AppError::RootUnavailable {
                id: root.id.to_string(),
                cause,
            });
        }

        self.events.record(
            Level::Info,
            "Pull operation completed",
            &[
                ("completed_count", summary.completed_count.to_string()),
                ("failed_count", summary.failed_count.to_string()),
            ],
        );
        Ok(summary)
    }

    /// Re-visits only the nodes recorded as failed, each from the kind and
    /// directory recorded with its failure.
    pub async fn pull_failed_only(&self) -> Result<PullSummary, AppError> {
        if self.store.failed().is_empty() {
            self.events
                .record(Level::Info, "No failed entities to retry", &[]);
            return Ok(self.summary());
        }

        let retries = self.store.reset_failed_only()?;
        self.events.record(
            Level::Info,
            "Retrying failed entities only",
            &[
                ("failed_count", retries.len().to_string()),
                ("max_concurrent", self.max_concurrent.to_string()),
            ],
        );

        let claims = &Claims::default();
        futures::stream::iter(retries)
            .map(|(id, failure)| async move {
                let node = failure.node_ref(&id);
                let base = resolve_location(&self.raw_dir, &failure.location);
                self.visit_claimed(&node, &base, claims).await
            })
            .buffer_unordered(self.max_concurrent)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(self.summary())
    }

    pub fn summary(&self) -> PullSummary {
        PullSummary::from(self.store.snapshot())
    }

    /// Clears all recorded progress.
    pub fn reset(&self) -> Result<(), AppError> {
        self.store.reset()
    }

    /// Processes `node` and its subtree with `base` as its snapshot directory.
    ///
    /// Per-node failures are recorded in the store, never returned; the
    /// only errors are fatal ones (unsaved progress, rejected credentials).
    pub async fn visit(&self, node: &NodeRef, base: &Path) -> Result<VisitOutcome, AppError> {
        self.visit_claimed(node, base, &Claims::default()).await
    }

    /// [`Crawler::visit`], skipping every node already present in `claims`
    /// and claiming each node before it is scheduled.
    async fn visit_claimed(
        &self,
        node: &NodeRef,
        base: &Path,
        claims: &Claims,
    ) -> Result<VisitOutcome, AppError> {
        if self.store.is_completed(&node.id) {
            self.skip_completed(node);
            return Ok(VisitOutcome::AlreadyCompleted);
        }
        if !claim(claims, &node.id) {
            self.skip_claimed(node);
            return Ok(VisitOutcome::AlreadyClaimed);
        }

        let mut traversal = Traversal::default();
        let mut stack = vec![Step::Visit {
            node: node.clone(),
            base: base.to_path_buf(),
        }];

        while let Some(step) = stack.pop() {
            match step {
                Step::Visit { node, base } => {
                    if self.store.is_completed(&node.id) {
                        self.skip_completed(&node);
                        continue;
                    }
                    match self.process_node(&node, &base).await {
                        Ok(sources) => {
                            stack.push(Step::Complete { node: node.clone() });
                            for source in sources.into_iter().rev() {
                                stack.push(Step::ListChildren {
                                    owner: node.clone(),
                                    source,
                                    base: base.clone(),
                                });
                            }
                        }
                        Err(error) => self.record_failure(&mut traversal, &node, &base, error)?,
                    }
                }
                Step::ListChildren {
                    owner,
                    source,
                    base,
                } => {
                    if traversal.failed.contains_key(&owner.id) {
                        continue;
                    }
                    match self.pull_children(&owner, source, &base).await {
                        Ok(children) => stack.extend(
                            children
                                .into_iter()
                                .rev()
                                .filter(|step| self.claim_step(step, claims)),
                        ),
                        Err(error) => self.record_failure(&mut traversal, &owner, &base, error)?,
                    }
                }
                Step::Download { block, dir } => {
                    if let Err(error) = self.downloader.download(&block, &dir).await {
                        self.events.record(
                            Level::Warn,
                            "Failed to download file attachment",
                            &[
                                ("block_id", block.id().to_string()),
                                ("error", error.to_string()),
                            ],
                        );
                    }
                }
                Step::Complete { node } => {
                    if !traversal.failed.contains_key(&node.id) {
                        self.store.mark_completed(&node.id)?;
                    }
                }
            }
        }

        Ok(match traversal.failed.remove(&node.id) {
            Some(message) => VisitOutcome::Failed(message),
            None => VisitOutcome::Completed,
        })
    }

    /// Fetches, classifies and saves one node; returns the listings its
    /// children come from.
    async fn process_node(
        &self,
        node: &NodeRef,
        base: &Path,
    ) -> Result<Vec<ChildSource>, AppError> {
        self.events.record(
            Level::Info,
            "Processing entity",
            &[("id", node.id.to_string()), ("kind", node.kind.to_string())],
        );

        let raw = self.client.retrieve(node).await?;
        let classified = Node::classify(node.kind, &raw)?;
        self.writer.write(base, node, SnapshotFacet::Main, &raw)?;

        if let Node::Block(block) = &classified {
            if block.is_child_page() {
                let page = self.client.retrieve_page(&node.id).await?;
                self.writer.write(base, node, SnapshotFacet::PageData, &page)?;
            }
        }

        Ok(match node.kind {
            NodeKind::Database => vec![ChildSource::DatabaseRows],
            NodeKind::Block | NodeKind::Page if classified.has_inline_database() => {
                vec![ChildSource::DatabaseRows, ChildSource::Blocks]
            }
            NodeKind::Block | NodeKind::Page => vec![ChildSource::Blocks],
        })
    }

    /// Paginates one listing, saves it as a children snapshot and turns each
    /// item into follow-up steps. Items that cannot be classified are skipped.
    async fn pull_children(
        &self,
        owner: &NodeRef,
        source: ChildSource,
        base: &Path,
    ) -> Result<Vec<Step>, AppError> {
        let (listing, list_type, label) = match source {
            ChildSource::Blocks => (
                all_block_children(self.client.as_ref(), &owner.id).await?,
                ChildListType::Block,
                NodeRef::block(owner.id.clone()),
            ),
            ChildSource::DatabaseRows => (
                all_database_rows(self.client.as_ref(), &owner.id).await?,
                ChildListType::Page,
                NodeRef::database(owner.id.clone()),
            ),
        };
        self.writer
            .write_children(base, &label, list_type, &listing.items)?;
        self.events.record(
            Level::Debug,
            "Pulled children",
            &[
                ("parent_id", owner.id.to_string()),
                ("type", list_type.as_str().to_string()),
                ("count", listing.items.len().to_string()),
                ("pages", listing.pages_fetched.to_string()),
            ],
        );

        if listing.items.is_empty() {
            return Ok(Vec::new());
        }

        let dir = child_dir(base, label.kind, &label.id);
        std::fs::create_dir_all(&dir).map_err(|e| persistence_error(&dir, &e))?;

        let steps = listing
            .items
            .iter()
            .filter_map(|item| match source {
                ChildSource::Blocks => self.block_child_step(owner, item, &dir),
                ChildSource::DatabaseRows => self.row_child_step(owner, item, &dir),
            })
            .collect();
        Ok(steps)
    }

    fn block_child_step(&self, parent: &NodeRef, item: &Value, dir: &Path) -> Option<Step> {
        let block = match Block::from_value(item) {
            Ok(block) => block,
            Err(error) => {
                self.events.record(
                    Level::Warn,
                    "Failed to process child block",
                    &[
                        ("parent_id", parent.id.to_string()),
                        ("child_id", id_hint(item)),
                        ("error", error.to_string()),
                    ],
                );
                return None;
            }
        };

        match block.child_dispatch() {
            ChildDispatch::Visit(node) => Some(Step::Visit {
                node,
                base: dir.to_path_buf(),
            }),
            ChildDispatch::Download(_) => Some(Step::Download {
                block,
                dir: dir.to_path_buf(),
            }),
            ChildDispatch::Leaf => None,
        }
    }

    fn row_child_step(&self, database: &NodeRef, item: &Value, dir: &Path) -> Option<Step> {
        match Page::from_value(item) {
            Ok(page) => Some(Step::Visit {
                node: NodeRef::block(page.id),
                base: dir.to_path_buf(),
            }),
            Err(error) => {
                self.events.record(
                    Level::Error,
                    "Failed to process database page",
                    &[
                        ("database_id", database.id.to_string()),
                        ("page_id", id_hint(item)),
                        ("error", error.to_string()),
                    ],
                );
                None
            }
        }
    }

    /// Records `error` against `node`. Fatal errors are returned after
    /// being recorded.
    fn record_failure(
        &self,
        traversal: &mut Traversal,
        node: &NodeRef,
        base: &Path,
        error: AppError,
    ) -> Result<(), AppError> {
        let message = error.describe();
        self.store.mark_failed(
            node,
            &message,
            &relative_location(&self.raw_dir, base),
        )?;
        self.events.record(
            Level::Error,
            "Failed to process entity",
            &[
                ("id", node.id.to_string()),
                ("kind", node.kind.to_string()),
                ("error", message.clone()),
            ],
        );
        traversal.failed.insert(node.id.clone(), message);

        if error.is_fatal() {
            return Err(error);
        }
        Ok(())
    }

    /// Claims the node a `Visit` step targets; other steps always pass.
    fn claim_step(&self, step: &Step, claims: &Claims) -> bool {
        match step {
            Step::Visit { node, .. } if !claim(claims, &node.id) => {
                self.skip_claimed(node);
                false
            }
            _ => true,
        }
    }

    fn skip_claimed(&self, node: &NodeRef) {
        self.events.record(
            Level::Debug,
            "Skipping entity already scheduled",
            &[("id", node.id.to_string()), ("kind", node.kind.to_string())],
        );
    }

    fn skip_completed(&self, node: &NodeRef) {
        self.events.record(
            Level::Debug,
            "Skipping already processed entity",
            &[("id", node.id.to_string()), ("kind", node.kind.to_string())],
        );
    }
}

fn claim(claims: &Claims, id: &NodeId) -> bool {
    claims.lock().insert(id.clone())
}

fn id_hint(item: &Value) -> String {
    item.get("id")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}
