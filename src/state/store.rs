//! Durable record of which nodes finished and which failed.

use crate::algebras::EventSink;
use crate::error::AppError;
use crate::output::paths::partial_path;
use crate::types::{NodeId, NodeKind, NodeRef};
use indexmap::{IndexMap, IndexSet};
use log::Level;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Why a node failed and where to retry it from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FailedRecord")]
pub struct FailedNode {
    pub kind: NodeKind,
    /// `"<cause-type>: <cause-message>"`
    pub message: String,
    /// Directory of the node's snapshots, relative to the raw root.
    pub location: String,
}

impl FailedNode {
    pub fn node_ref(&self, id: &NodeId) -> NodeRef {
        NodeRef::new(id.clone(), self.kind)
    }
}

/// On-disk forms of a failed entry. Older state files hold only the message.
#[derive(Deserialize)]
#[serde(untagged)]
enum FailedRecord {
    Detailed {
        kind: NodeKind,
        message: String,
        #[serde(default)]
        location: String,
    },
    Message(String),
}

impl From<FailedRecord> for FailedNode {
    fn from(record: FailedRecord) -> Self {
        match record {
            FailedRecord::Detailed {
                kind,
                message,
                location,
            } => FailedNode {
                kind,
                message,
                location,
            },
            FailedRecord::Message(message) => FailedNode {
                kind: NodeKind::Block,
                message,
                location: String::new(),
            },
        }
    }
}

/// Everything persisted in the state file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullState {
    #[serde(default)]
    pub completed: IndexSet<NodeId>,
    #[serde(default)]
    pub failed: IndexMap<NodeId, FailedNode>,
    #[serde(default)]
    pub metadata: IndexMap<String, Value>,
}

/// Counts and failure messages for reporting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    pub completed_count: usize,
    pub failed: IndexMap<NodeId, String>,
}

/// Mutex-guarded [`PullState`] that rewrites its file after every mutation.
///
/// Writes go to a temp file renamed over the state file, so the file on
/// disk always holds the last successful persist in full.
pub struct ProgressStore {
    path: PathBuf,
    state: Mutex<PullState>,
    events: Arc<dyn EventSink>,
}

impl ProgressStore {
    /// Loads the store at `path`. A missing file starts empty; so does an
    /// unreadable or corrupt one, with a warning.
    pub fn load(path: impl Into<PathBuf>, events: Arc<dyn EventSink>) -> Self {
        let path = path.into();
        let state = match read_state(&path) {
            Ok(Some(state)) => {
                events.record(
                    Level::Debug,
                    "Loaded pull state",
                    &[
                        ("path", path.display().to_string()),
                        ("completed", state.completed.len().to_string()),
                        ("failed", state.failed.len().to_string()),
                    ],
                );
                state
            }
            Ok(None) => PullState::default(),
            Err(cause) => {
                events.record(
                    Level::Warn,
                    "Could not load pull state, starting fresh",
                    &[("path", path.display().to_string()), ("error", cause)],
                );
                PullState::default()
            }
        };

        Self {
            path,
            state: Mutex::new(state),
            events,
        }
    }

    pub fn is_completed(&self, id: &NodeId) -> bool {
        self.state.lock().completed.contains(id)
    }

    /// Records `id` as done and drops any failure recorded for it.
    pub fn mark_completed(&self, id: &NodeId) -> Result<(), AppError> {
        self.mutate(|state| {
            state.completed.insert(id.clone());
            state.failed.shift_remove(id);
        })
    }

    /// Records a failure for `node`, replacing any earlier one.
    pub fn mark_failed(
        &self,
        node: &NodeRef,
        message: &str,
        location: &str,
    ) -> Result<(), AppError> {
        self.mutate(|state| {
            state.failed.insert(
                node.id.clone(),
                FailedNode {
                    kind: node.kind,
                    message: message.to_string(),
                    location: location.to_string(),
                },
            );
        })
    }

    /// Forgets everything.
    pub fn reset(&self) -> Result<(), AppError> {
        self.mutate(|state| *state = PullState::default())?;
        self.events.record(
            Level::Info,
            "Reset pull state",
            &[("path", self.path.display().to_string())],
        );
        Ok(())
    }

    /// Clears the failed map and un-completes those ids, returning the
    /// entries that were cleared.
    pub fn reset_failed_only(&self) -> Result<IndexMap<NodeId, FailedNode>, AppError> {
        let mut cleared = IndexMap::new();
        self.mutate(|state| {
            cleared = std::mem::take(&mut state.failed);
            for id in cleared.keys() {
                state.completed.shift_remove(id);
            }
        })?;
        self.events.record(
            Level::Info,
            "Reset failed entries",
            &[("count", cleared.len().to_string())],
        );
        Ok(cleared)
    }

    pub fn failed(&self) -> IndexMap<NodeId, FailedNode> {
        self.state.lock().failed.clone()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let state = self.state.lock();
        StateSnapshot {
            completed_count: state.completed.len(),
            failed: state
                .failed
                .iter()
                .map(|(id, failure)| (id.clone(), failure.message.clone()))
                .collect(),
        }
    }

    pub fn set_metadata(&self, key: &str, value: Value) -> Result<(), AppError> {
        self.mutate(|state| {
            state.metadata.insert(key.to_string(), value);
        })
    }

    pub fn metadata(&self, key: &str) -> Option<Value> {
        self.state.lock().metadata.get(key).cloned()
    }

    /// Applies `change` and persists the result while holding the lock.
    fn mutate(&self, change: impl FnOnce(&mut PullState)) -> Result<(), AppError> {
        let mut state = self.state.lock();
        change(&mut *state);
        self.persist(&*state)
    }

    fn persist(&self, state: &PullState) -> Result<(), AppError> {
        let store_error = |cause: String| AppError::StateStore {
            path: self.path.clone(),
            cause,
        };

        let body = serde_json::to_vec_pretty(state).map_err(|e| store_error(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| store_error(e.to_string()))?;
        }
        let temp = partial_path(&self.path);
        fs::write(&temp, &body).map_err(|e| store_error(e.to_string()))?;
        fs::rename(&temp, &self.path).map_err(|e| store_error(e.to_string()))
    }
}

fn read_state(path: &Path) -> Result<Option<PullState>, String> {
    let body = match fs::read(path) {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebras::MemorySink;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store_in(dir: &Path) -> (ProgressStore, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let store = ProgressStore::load(dir.join("pull_state.json"), sink.clone());
        (store, sink)
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (store, sink) = store_in(dir.path());
        assert_eq!(store.snapshot(), StateSnapshot::default());
        assert!(sink.events_named("Could not load pull state, starting fresh").is_empty());
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(dir.path());
        let b1 = NodeId::new("b1");

        store
            .mark_failed(&NodeRef::database("b1"), "NotionService: boom", "block_root")
            .unwrap();
        store.mark_completed(&NodeId::new("b2")).unwrap();

        let (reloaded, _) = store_in(dir.path());
        assert!(reloaded.is_completed(&NodeId::new("b2")));
        let failed = reloaded.failed();
        assert_eq!(
            failed[&b1],
            FailedNode {
                kind: NodeKind::Database,
                message: "NotionService: boom".to_string(),
                location: "block_root".to_string(),
            }
        );
    }

    #[test]
    fn test_mark_completed_clears_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(dir.path());
        let id = NodeId::new("b1");

        store.mark_failed(&NodeRef::block("b1"), "Persistence: disk", "").unwrap();
        store.mark_completed(&id).unwrap();
        store.mark_completed(&id).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.completed_count, 1);
        assert!(snapshot.failed.is_empty());
    }

    #[test]
    fn test_reset_failed_only_uncompletes_failed_ids() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(dir.path());

        store.mark_completed(&NodeId::new("ok")).unwrap();
        store.mark_completed(&NodeId::new("flaky")).unwrap();
        store.mark_failed(&NodeRef::block("flaky"), "x", "").unwrap();
        store.mark_failed(&NodeRef::page("bad"), "y", "").unwrap();

        let cleared = store.reset_failed_only().unwrap();
        assert_eq!(cleared.len(), 2);
        assert!(store.is_completed(&NodeId::new("ok")));
        assert!(!store.is_completed(&NodeId::new("flaky")));
        assert!(store.failed().is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(dir.path());
        store.mark_completed(&NodeId::new("a")).unwrap();
        store.set_metadata("root_id", json!("a")).unwrap();

        store.reset().unwrap();

        let (reloaded, _) = store_in(dir.path());
        assert_eq!(reloaded.snapshot(), StateSnapshot::default());
        assert_eq!(reloaded.metadata("root_id"), None);
    }

    #[test]
    fn test_corrupt_file_starts_empty_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pull_state.json"), b"{\"completed\": [").unwrap();

        let (store, sink) = store_in(dir.path());
        assert_eq!(store.snapshot().completed_count, 0);
        let warnings = sink.events_named("Could not load pull state, starting fresh");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, Level::Warn);
    }

    #[test]
    fn test_plain_string_failures_load_as_blocks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("pull_state.json"),
            serde_json::to_vec(&json!({
                "completed": ["a"],
                "failed": { "b": "NetworkFailure: timed out" },
                "metadata": {}
            }))
            .unwrap(),
        )
        .unwrap();

        let (store, _) = store_in(dir.path());
        let failed = store.failed();
        let entry = &failed[&NodeId::new("b")];
        assert_eq!(entry.kind, NodeKind::Block);
        assert_eq!(entry.location, "");
        assert_eq!(entry.message, "NetworkFailure: timed out");
    }

    #[test]
    fn test_unwritable_path_is_state_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        fs::write(&blocker, b"file").unwrap();
        let store = ProgressStore::load(
            blocker.join("pull_state.json"),
            Arc::new(MemorySink::new()),
        );

        let err = store.mark_completed(&NodeId::new("a")).unwrap_err();
        assert!(matches!(err, AppError::StateStore { .. }));
        assert!(err.is_fatal());
    }
}
