//! Configuration management

use serde::{Deserialize, Serialize};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default PostgreSQL connection parts, used when `DATABASE_URL` is unset.
pub const DEFAULT_POSTGRES_HOST: &str = "127.0.0.1";
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;
pub const DEFAULT_POSTGRES_USER: &str = "validator";
pub const DEFAULT_POSTGRES_PASSWORD: &str = "val1dat0r";
pub const DEFAULT_POSTGRES_DB: &str = "project-sem-1";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (5 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 300;

/// Largest accepted archive body (50 MiB).
pub const DEFAULT_MAX_ARCHIVE_BYTES: usize = 50 << 20;

/// Largest accepted extracted `data.csv` (200 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 200 << 20;

/// Largest accepted number of data rows per upload.
pub const DEFAULT_MAX_ROWS: usize = 1_000_000;

/// Default CORS allowed origin.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub limits: IngestLimits,
    pub cors: CorsConfig,
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

/// Hard ceilings applied to every upload before and during parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestLimits {
    pub max_archive_bytes: usize,
    pub max_payload_bytes: u64,
    pub max_rows: usize,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// `DATABASE_URL` if set, otherwise assembled from the `POSTGRES_*` variables.
fn database_url() -> String {
    if let Some(url) = std::env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty()) {
        return url;
    }

    format!(
        "postgresql://{}:{}@{}:{}/{}?sslmode=disable",
        env_string("POSTGRES_USER", DEFAULT_POSTGRES_USER),
        env_string("POSTGRES_PASSWORD", DEFAULT_POSTGRES_PASSWORD),
        env_string("POSTGRES_HOST", DEFAULT_POSTGRES_HOST),
        env_or("POSTGRES_PORT", DEFAULT_POSTGRES_PORT),
        env_string("POSTGRES_DB", DEFAULT_POSTGRES_DB),
    )
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: env_string("PRICEKEEP_HOST", DEFAULT_SERVER_HOST),
                port: env_or("PRICEKEEP_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "PRICEKEEP_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: database_url(),
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
            limits: IngestLimits {
                max_archive_bytes: env_or("PRICEKEEP_MAX_ARCHIVE_BYTES", DEFAULT_MAX_ARCHIVE_BYTES),
                max_payload_bytes: env_or("PRICEKEEP_MAX_PAYLOAD_BYTES", DEFAULT_MAX_PAYLOAD_BYTES),
                max_rows: env_or("PRICEKEEP_MAX_ROWS", DEFAULT_MAX_ROWS),
            },
            cors: CorsConfig {
                allowed_origins: env_string("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN)
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", false),
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

        if self.limits.max_archive_bytes == 0
            || self.limits.max_payload_bytes == 0
            || self.limits.max_rows == 0
        {
            anyhow::bail!("Ingest limits must all be greater than 0");
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
                url: format!(
                    "postgresql://{}:{}@{}:{}/{}?sslmode=disable",
                    DEFAULT_POSTGRES_USER,
                    DEFAULT_POSTGRES_PASSWORD,
                    DEFAULT_POSTGRES_HOST,
                    DEFAULT_POSTGRES_PORT,
                    DEFAULT_POSTGRES_DB
                ),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            limits: IngestLimits::default(),
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: false,
            },
        }
    }
}
