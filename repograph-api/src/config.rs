//! Service Configuration Module
//!
//! Configuration is loaded from environment variables with sensible defaults
//! for development. Each concern has its own struct with `Default` and
//! `from_env()`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CACHE_MAX_SIZE_MB, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_GAUGE_INTERVAL_SECS,
    DEFAULT_GRAPH_ADDR, DEFAULT_GRAPH_PORT, DEFAULT_TOP_REPOS_LIMIT, DEFAULT_WEB_PORT,
    DEFAULT_WRITE_QUEUE_CAPACITY,
};
use crate::error::{ApiError, ApiResult};

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|s| s.parse().ok())
}

// ============================================================================
// SERVER CONFIGURATION
// ============================================================================

/// Which services this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    /// Front service; graph generation is delegated to the worker.
    Web,
    /// Isolated graph worker only.
    Graph,
    /// Front service with in-process graph generation.
    Standalone,
}

impl ServiceMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "web" => Some(ServiceMode::Web),
            "graph" => Some(ServiceMode::Graph),
            "standalone" => Some(ServiceMode::Standalone),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceMode::Web => "web",
            ServiceMode::Graph => "graph",
            ServiceMode::Standalone => "standalone",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            ServiceMode::Graph => DEFAULT_GRAPH_PORT,
            ServiceMode::Web | ServiceMode::Standalone => DEFAULT_WEB_PORT,
        }
    }
}

/// Listener, mode, and front-service settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub mode: ServiceMode,
    pub bind_host: String,
    pub port: u16,
    /// `host:port` of the graph worker, used in `web` mode.
    pub graph_addr: String,
    /// Maximum entries returned by `/top-repos`.
    pub top_repos_limit: usize,
    /// Allowed CORS origins. Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: ServiceMode::Standalone,
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_WEB_PORT,
            graph_addr: DEFAULT_GRAPH_ADDR.to_string(),
            top_repos_limit: DEFAULT_TOP_REPOS_LIMIT,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Create ServerConfig from environment variables.
    ///
    /// Environment variables:
    /// - `REPOGRAPH_MODE`: `web`, `graph` or `standalone` (default: standalone)
    /// - `REPOGRAPH_BIND`: Listen host (default: 0.0.0.0)
    /// - `PORT` / `REPOGRAPH_PORT`: Listen port (default: 8888, or 8889 in graph mode)
    /// - `REPOGRAPH_GRAPH_ADDR`: Graph worker address (default: localhost:8889)
    /// - `REPOGRAPH_TOP_REPOS_LIMIT`: Entries in `/top-repos` (default: 10)
    /// - `REPOGRAPH_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    pub fn from_env() -> ApiResult<Self> {
        let mode = match env_string("REPOGRAPH_MODE") {
            Some(value) => ServiceMode::parse(&value).ok_or_else(|| {
                ApiError::invalid_input(format!("Invalid REPOGRAPH_MODE value: {}", value))
            })?,
            None => ServiceMode::Standalone,
        };

        let port = match env_string("PORT").or_else(|| env_string("REPOGRAPH_PORT")) {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", value)))?,
            None => mode.default_port(),
        };

        let cors_origins = env_string("REPOGRAPH_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            mode,
            bind_host: env_string("REPOGRAPH_BIND").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            graph_addr: env_string("REPOGRAPH_GRAPH_ADDR")
                .unwrap_or_else(|| DEFAULT_GRAPH_ADDR.to_string()),
            top_repos_limit: env_parse("REPOGRAPH_TOP_REPOS_LIMIT")
                .unwrap_or(DEFAULT_TOP_REPOS_LIMIT),
            cors_origins,
        })
    }

    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }
}

// ============================================================================
// CACHE STORE CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Lmdb,
    Memory,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: CacheBackend,
    pub path: PathBuf,
    pub max_size_mb: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Lmdb,
            path: std::env::temp_dir().join("repograph-cache"),
            max_size_mb: DEFAULT_CACHE_MAX_SIZE_MB,
        }
    }
}

impl StoreConfig {
    /// Environment variables:
    /// - `REPOGRAPH_CACHE_BACKEND`: `lmdb` or `memory` (default: lmdb)
    /// - `REPOGRAPH_CACHE_PATH`: LMDB directory (default: $TMPDIR/repograph-cache)
    /// - `REPOGRAPH_CACHE_MAX_SIZE_MB`: LMDB map size (default: 1024)
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();
        let backend = match env_string("REPOGRAPH_CACHE_BACKEND").as_deref() {
            None | Some("lmdb") => CacheBackend::Lmdb,
            Some("memory") => CacheBackend::Memory,
            Some(other) => {
                return Err(ApiError::invalid_input(format!(
                    "Invalid REPOGRAPH_CACHE_BACKEND value: {}",
                    other
                )))
            }
        };

        Ok(Self {
            backend,
            path: env_string("REPOGRAPH_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            max_size_mb: env_parse("REPOGRAPH_CACHE_MAX_SIZE_MB").unwrap_or(defaults.max_size_mb),
        })
    }
}

// ============================================================================
// BACKGROUND WRITER CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Pending writes allowed before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_WRITE_QUEUE_CAPACITY,
        }
    }
}

impl WriterConfig {
    /// - `REPOGRAPH_WRITE_QUEUE_CAPACITY` (default: 1024)
    pub fn from_env() -> Self {
        Self {
            queue_capacity: env_parse("REPOGRAPH_WRITE_QUEUE_CAPACITY")
                .unwrap_or(DEFAULT_WRITE_QUEUE_CAPACITY),
        }
    }
}

// ============================================================================
// PIPELINE CONFIGURATION
// ============================================================================

/// External tools and where sources are materialized.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub work_dir: PathBuf,
    pub command_timeout: Duration,
    pub git_bin: String,
    pub goda_bin: String,
    pub dot_bin: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("repograph"),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            git_bin: "git".to_string(),
            goda_bin: "goda".to_string(),
            dot_bin: "dot".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Environment variables:
    /// - `REPOGRAPH_WORK_DIR`: Materialization root (default: $TMPDIR/repograph)
    /// - `REPOGRAPH_COMMAND_TIMEOUT_SECS`: Per-command timeout (default: 300)
    /// - `REPOGRAPH_GIT_BIN`, `REPOGRAPH_GODA_BIN`, `REPOGRAPH_DOT_BIN`: Tool names
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: env_string("REPOGRAPH_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            command_timeout: env_parse("REPOGRAPH_COMMAND_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.command_timeout),
            git_bin: env_string("REPOGRAPH_GIT_BIN").unwrap_or(defaults.git_bin),
            goda_bin: env_string("REPOGRAPH_GODA_BIN").unwrap_or(defaults.goda_bin),
            dot_bin: env_string("REPOGRAPH_DOT_BIN").unwrap_or(defaults.dot_bin),
        }
    }
}

// ============================================================================
// JOBS CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct JobsConfig {
    /// How often the cache size gauges are refreshed.
    pub gauge_interval: Duration,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            gauge_interval: Duration::from_secs(DEFAULT_GAUGE_INTERVAL_SECS),
        }
    }
}

impl JobsConfig {
    /// - `REPOGRAPH_GAUGE_INTERVAL_SECS` (default: 15)
    pub fn from_env() -> Self {
        Self {
            gauge_interval: env_parse("REPOGRAPH_GAUGE_INTERVAL_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_GAUGE_INTERVAL_SECS)),
        }
    }
}

// ============================================================================
// AGGREGATE
// ============================================================================

/// Everything the binary needs to start.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub writer: WriterConfig,
    pub pipeline: PipelineConfig,
    pub jobs: JobsConfig,
}

impl AppConfig {
    pub fn from_env() -> ApiResult<Self> {
        let config = Self {
            server: ServerConfig::from_env()?,
            store: StoreConfig::from_env()?,
            writer: WriterConfig::from_env(),
            pipeline: PipelineConfig::from_env(),
            jobs: JobsConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that cannot work.
    ///
    /// The front service and the graph worker run as separate processes in
    /// `web`/`graph` mode. A refresh on one side must clear the tiers the
    /// other side wrote, so they need a store both can open.
    pub fn validate(&self) -> ApiResult<()> {
        if self.store.backend == CacheBackend::Memory && self.server.mode != ServiceMode::Standalone
        {
            return Err(ApiError::invalid_input(format!(
                "REPOGRAPH_CACHE_BACKEND=memory is only supported in standalone mode, not '{}'",
                self.server.mode.as_str()
            )));
        }
        Ok(())
    }
}
