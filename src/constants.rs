// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role.

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// How many objects the Notion API returns per page of results.
///
/// The Notion API maximum is 100. We use the maximum to minimize
/// round-trips while paginating children and database rows.
pub const NOTION_API_PAGE_SIZE: usize = 100;

/// API version sent with every request.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Base URL of the public Notion REST API.
pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";

// ---------------------------------------------------------------------------
// Pacing and retry defaults
// ---------------------------------------------------------------------------

/// Seconds slept before every API attempt. Notion averages three requests
/// per second per integration.
pub const DEFAULT_API_DELAY_SECS: f64 = 1.0;

/// Total attempts per logical API operation.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Multiplier applied to the delay for each failed attempt.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Ceiling on any single wait between attempts, and on the configured delay.
pub const MAX_BACKOFF_SECS: u64 = 600;

/// Bounded fan-out used when retrying failed subtrees.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Upper bound on `max_concurrent`.
pub const MAX_CONCURRENT_LIMIT: usize = 32;

/// HTTP timeout for a single API request.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// HTTP timeout for a single attachment download.
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

// ---------------------------------------------------------------------------
// On-disk layout
// ---------------------------------------------------------------------------

/// Default root for all pulled data.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Progress state file inside an entity data directory.
pub const PULL_STATE_FILE: &str = "pull_state.json";

/// Snapshot tree inside an entity data directory.
pub const RAW_DIR: &str = "raw";

/// Config file read from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "notion-puller.toml";

/// Suffix for in-flight downloads and state writes before the atomic rename.
pub const PARTIAL_FILE_SUFFIX: &str = "part";

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
