//! Application configuration management.

use serde::Deserialize;
use uuid::Uuid;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Tenant resolution configuration.
    #[serde(default)]
    pub tenancy: TenancyConfig,
    /// Document code generation configuration.
    #[serde(default)]
    pub codegen: CodeGenConfig,
    /// Public share link configuration.
    #[serde(default)]
    pub share: ShareConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration as read from config sources.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for verifying tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Tenant resolution configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenancyConfig {
    /// Tenant used by anonymous flows that explicitly ask for it.
    pub public_tenant_id: Option<Uuid>,
}

/// Document code generation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeGenConfig {
    /// Upper bound for waiting on the per-scope counter lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Attempts before giving up on a unique code.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First backoff step between attempts.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    /// Ceiling for a single backoff step.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for CodeGenConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_lock_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_backoff_ms() -> u64 {
    20
}

fn default_max_backoff_ms() -> u64 {
    500
}

/// Public share link configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareConfig {
    /// TTL applied when the caller does not pass one.
    #[serde(default = "default_ttl_days")]
    pub default_ttl_days: u32,
    /// Longest TTL a caller may request.
    #[serde(default = "default_max_ttl_days")]
    pub max_ttl_days: u32,
    /// Whether links without an expiry may be issued.
    #[serde(default)]
    pub allow_no_expiry: bool,
    /// Base URL that public share links are built on.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            default_ttl_days: default_ttl_days(),
            max_ttl_days: default_max_ttl_days(),
            allow_no_expiry: false,
            public_base_url: default_public_base_url(),
        }
    }
}

fn default_ttl_days() -> u32 {
    30
}

fn default_max_ttl_days() -> u32 {
    365
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TESSERA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
