//! Constants for the repograph services
//!
//! Default values used by configuration and the HTTP surface.

// ============================================================================
// NETWORK
// ============================================================================

/// Default listen port of the front service
pub const DEFAULT_WEB_PORT: u16 = 8888;

/// Default listen port of the graph worker
pub const DEFAULT_GRAPH_PORT: u16 = 8889;

/// Default graph worker address. Only this address is contacted over plain http.
pub const DEFAULT_GRAPH_ADDR: &str = "localhost:8889";

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// FRONT SERVICE
// ============================================================================

/// Default number of entries returned by `/top-repos`
pub const DEFAULT_TOP_REPOS_LIMIT: usize = 10;

/// Query value that enables clustering. Anything else disables it.
pub const CLUSTER_ENABLED_VALUE: &str = "true";

/// Content type of plain-text responses
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

// ============================================================================
// STORAGE AND BACKGROUND WORK
// ============================================================================

/// Default LMDB map size in megabytes
pub const DEFAULT_CACHE_MAX_SIZE_MB: usize = 1024;

/// Default capacity of the background write queue
pub const DEFAULT_WRITE_QUEUE_CAPACITY: usize = 1024;

/// Default timeout for each external tool invocation
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// Default interval between cache size gauge refreshes
pub const DEFAULT_GAUGE_INTERVAL_SECS: u64 = 15;
