use crate::state::StateSnapshot;
use crate::types::NodeId;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Operator-facing totals for the store after a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullSummary {
    pub completed_count: usize,
    pub failed_count: usize,
    pub failed_details: IndexMap<NodeId, String>,
}

impl From<StateSnapshot> for PullSummary {
    fn from(snapshot: StateSnapshot) -> Self {
        Self {
            completed_count: snapshot.completed_count,
            failed_count: snapshot.failed.len(),
            failed_details: snapshot.failed,
        }
    }
}

impl fmt::Display for PullSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Completed entities: {}", self.completed_count)?;
        write!(f, "Failed entities: {}", self.failed_count)?;
        for (id, message) in &self.failed_details {
            write!(f, "\n  - {}: {}", id, message)?;
        }
        Ok(())
    }
}
