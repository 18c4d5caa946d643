//! Crawl progress that survives restarts.

mod store;

pub use store::{FailedNode, ProgressStore, PullState, StateSnapshot};
