//! Configuration management
//!
//! All settings are read once at startup by [`Config::load`] and passed down
//! explicitly to the stores, the search client, and the batch workers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/venue_search";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:5173";

// ============================================================================
// Search Configuration Constants
// ============================================================================

/// SerpAPI endpoint.
pub const DEFAULT_SERPAPI_BASE_URL: &str = "https://serpapi.com";

/// Timeout for a single SerpAPI request in seconds.
pub const DEFAULT_SERPAPI_TIMEOUT_SECS: u64 = 30;

/// Number of images kept per search.
pub const DEFAULT_SEARCH_RESULT_LIMIT: usize = 15;

// ============================================================================
// Batch Configuration Constants
// ============================================================================

/// Number of worker tasks draining imports.
pub const DEFAULT_BATCH_WORKERS: usize = 2;

/// Capacity of the in-process import queue.
pub const DEFAULT_BATCH_QUEUE_CAPACITY: usize = 256;

/// Upper bound for one venue search inside a batch, in seconds.
pub const DEFAULT_BATCH_SEARCH_TIMEOUT_SECS: u64 = 60;

/// How long a claimed item stays owned by its worker without a heartbeat.
pub const DEFAULT_BATCH_LEASE_SECS: u64 = 120;

/// Heartbeat interval for in-flight items.
pub const DEFAULT_BATCH_HEARTBEAT_SECS: u64 = 30;

/// How often the reaper looks for expired leases.
pub const DEFAULT_BATCH_REAPER_INTERVAL_SECS: u64 = 60;

/// Dispatch attempts before an item with expired leases is marked as an error.
pub const DEFAULT_BATCH_MAX_ATTEMPTS: i32 = 3;

/// Maximum number of venue names accepted in one import.
pub const DEFAULT_BATCH_MAX_NAMES: usize = 5_000;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub search: SearchConfig,
    pub batch: BatchConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// External search API configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// SerpAPI key; never logged
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub result_limit: usize,
    /// Also look the venue up on Google Hotels and store its details
    pub hotel_details: bool,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("result_limit", &self.result_limit)
            .field("hotel_details", &self.hotel_details)
            .finish()
    }
}

/// Batch import processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub search_timeout_secs: u64,
    pub lease_secs: u64,
    pub heartbeat_secs: u64,
    pub reaper_interval_secs: u64,
    pub max_attempts: i32,
    pub max_names: usize,
}

impl BatchConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("VENUE_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_or("VENUE_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "VENUE_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_or(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or(
                    "DATABASE_IDLE_TIMEOUT",
                    DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
                ),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true),
            },
            search: SearchConfig {
                api_key: std::env::var("SERPAPI_API_KEY").unwrap_or_default(),
                base_url: std::env::var("SERPAPI_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_SERPAPI_BASE_URL.to_string()),
                timeout_secs: env_or("SERPAPI_TIMEOUT_SECS", DEFAULT_SERPAPI_TIMEOUT_SECS),
                result_limit: env_or("SEARCH_RESULT_LIMIT", DEFAULT_SEARCH_RESULT_LIMIT),
                hotel_details: env_or("SEARCH_HOTEL_DETAILS", false),
            },
            batch: BatchConfig {
                workers: env_or("BATCH_WORKERS", DEFAULT_BATCH_WORKERS),
                queue_capacity: env_or("BATCH_QUEUE_CAPACITY", DEFAULT_BATCH_QUEUE_CAPACITY),
                search_timeout_secs: env_or(
                    "BATCH_SEARCH_TIMEOUT_SECS",
                    DEFAULT_BATCH_SEARCH_TIMEOUT_SECS,
                ),
                lease_secs: env_or("BATCH_LEASE_SECS", DEFAULT_BATCH_LEASE_SECS),
                heartbeat_secs: env_or("BATCH_HEARTBEAT_SECS", DEFAULT_BATCH_HEARTBEAT_SECS),
                reaper_interval_secs: env_or(
                    "BATCH_REAPER_INTERVAL_SECS",
                    DEFAULT_BATCH_REAPER_INTERVAL_SECS,
                ),
                max_attempts: env_or("BATCH_MAX_ATTEMPTS", DEFAULT_BATCH_MAX_ATTEMPTS),
                max_names: env_or("BATCH_MAX_NAMES", DEFAULT_BATCH_MAX_NAMES),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.search.api_key.trim().is_empty() {
            anyhow::bail!("SERPAPI_API_KEY is required");
        }

        if self.search.result_limit == 0 {
            anyhow::bail!("SEARCH_RESULT_LIMIT must be greater than 0");
        }

        if self.batch.workers == 0 {
            anyhow::bail!("BATCH_WORKERS must be greater than 0");
        }

        if self.batch.queue_capacity == 0 {
            anyhow::bail!("BATCH_QUEUE_CAPACITY must be greater than 0");
        }

        if self.batch.max_attempts < 1 {
            anyhow::bail!("BATCH_MAX_ATTEMPTS must be at least 1");
        }

        // A heartbeat slower than the lease lets the reaper steal live items.
        if self.batch.heartbeat_secs == 0 || self.batch.heartbeat_secs >= self.batch.lease_secs {
            anyhow::bail!(
                "BATCH_HEARTBEAT_SECS ({}) must be non-zero and shorter than BATCH_LEASE_SECS ({})",
                self.batch.heartbeat_secs,
                self.batch.lease_secs
            );
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            search: SearchConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_SERPAPI_BASE_URL.to_string(),
            timeout_secs: DEFAULT_SERPAPI_TIMEOUT_SECS,
            result_limit: DEFAULT_SEARCH_RESULT_LIMIT,
            hotel_details: false,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_BATCH_WORKERS,
            queue_capacity: DEFAULT_BATCH_QUEUE_CAPACITY,
            search_timeout_secs: DEFAULT_BATCH_SEARCH_TIMEOUT_SECS,
            lease_secs: DEFAULT_BATCH_LEASE_SECS,
            heartbeat_secs: DEFAULT_BATCH_HEARTBEAT_SECS,
            reaper_interval_secs: DEFAULT_BATCH_REAPER_INTERVAL_SECS,
            max_attempts: DEFAULT_BATCH_MAX_ATTEMPTS,
            max_names: DEFAULT_BATCH_MAX_NAMES,
        }
    }
}
