//! Configuration management for repasseweb
//!
//! This module handles loading, validation, and management of
//! repasseweb configuration from YAML files, with secrets optionally
//! supplied through the environment.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use error::{ConfigError, ConfigErrorCode, ConfigResult};

/// Environment variable overriding `auth.admin_email`
pub const ENV_ADMIN_EMAIL: &str = "REPASSEWEB_ADMIN_EMAIL";
/// Environment variable overriding `auth.admin_password`
pub const ENV_ADMIN_PASSWORD: &str = "REPASSEWEB_ADMIN_PASSWORD";
/// Environment variable overriding `backend.url`
pub const ENV_BACKEND_URL: &str = "REPASSEWEB_BACKEND_URL";
/// Environment variable overriding `backend.api_key`
pub const ENV_BACKEND_KEY: &str = "REPASSEWEB_BACKEND_KEY";

/// Longest accepted session lifetime (one year)
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;

// ==================== Configuration Types ====================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed to call the API with credentials (empty disables CORS)
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: vec![],
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

/// Admin authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Admin login email
    #[serde(default)]
    pub admin_email: String,
    /// Admin login password
    #[serde(default)]
    pub admin_password: String,
    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Session lifetime in hours
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,
    /// Mark the session cookie as `Secure`
    #[serde(default = "default_true")]
    pub secure_cookie: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_email: String::new(),
            admin_password: String::new(),
            cookie_name: default_cookie_name(),
            session_ttl_hours: default_session_ttl_hours(),
            secure_cookie: true,
        }
    }
}

fn default_cookie_name() -> String {
    "admin_token".to_string()
}

fn default_session_ttl_hours() -> u64 {
    24 * 7
}

fn default_true() -> bool {
    true
}

/// Which backend serves ledger data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process store, optionally seeded from a YAML file
    Memory,
    /// Hosted database reached through its PostgREST API
    Postgrest,
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Memory
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "postgrest" | "supabase" => Ok(BackendKind::Postgrest),
            _ => Err(format!("Invalid backend kind: {}", s)),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Postgrest => write!(f, "postgrest"),
        }
    }
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackendConfig {
    /// Backend kind
    #[serde(default)]
    pub kind: BackendKind,
    /// Base URL of the hosted project (postgrest only)
    #[serde(default)]
    pub url: String,
    /// API key sent as `apikey` and bearer token (postgrest only)
    #[serde(default)]
    pub api_key: String,
    /// Seed file loaded at startup (memory only)
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

/// Query limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Rows returned by ledger history queries
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Days of platform revenue to fetch
    #[serde(default = "default_revenue_days")]
    pub revenue_days: usize,
    /// Restaurants listed in the revenue ranking
    #[serde(default = "default_top_restaurants")]
    pub top_restaurants: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            revenue_days: default_revenue_days(),
            top_restaurants: default_top_restaurants(),
        }
    }
}

fn default_history_limit() -> usize {
    50
}

fn default_revenue_days() -> usize {
    30
}

fn default_top_restaurants() -> usize {
    10
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Admin authentication
    #[serde(default)]
    pub auth: AuthConfig,
    /// Ledger backend
    #[serde(default)]
    pub backend: BackendConfig,
    /// Query limits
    #[serde(default)]
    pub query: QueryConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file, apply environment overrides and validate
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let display = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound { path: display.clone() },
            _ => ConfigError::IoError { path: display.clone(), source: e },
        })?;

        let mut config = Self::from_yaml(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from YAML text without validating it
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
            message: e.to_string(),
        })
    }

    /// Overwrite secrets from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_ADMIN_EMAIL) {
            self.auth.admin_email = v;
        }
        if let Some(v) = lookup(ENV_ADMIN_PASSWORD) {
            self.auth.admin_password = v;
        }
        if let Some(v) = lookup(ENV_BACKEND_URL) {
            self.backend.url = v;
        }
        if let Some(v) = lookup(ENV_BACKEND_KEY) {
            self.backend.api_key = v;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if self.auth.admin_email.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "auth.admin_email".to_string(),
            });
        }
        if self.auth.admin_password.is_empty() {
            return Err(ConfigError::MissingField {
                field: "auth.admin_password".to_string(),
            });
        }
        if self.auth.cookie_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "auth.cookie_name".to_string(),
                reason: "Cookie name cannot be empty".to_string(),
            });
        }
        if self.auth.session_ttl_hours == 0 || self.auth.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(ConfigError::InvalidValue {
                field: "auth.session_ttl_hours".to_string(),
                reason: format!(
                    "Session lifetime must be between 1 and {} hours",
                    MAX_SESSION_TTL_HOURS
                ),
            });
        }

        if self.backend.kind == BackendKind::Postgrest {
            if self.backend.url.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "backend.url".to_string(),
                });
            }
            if !self.backend.url.starts_with("http://") && !self.backend.url.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    field: "backend.url".to_string(),
                    reason: "Backend URL must start with http:// or https://".to_string(),
                });
            }
        }

        if self.query.history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "query.history_limit".to_string(),
                reason: "History limit must be greater than 0".to_string(),
            });
        }
        if self.query.revenue_days == 0 || self.query.top_restaurants == 0 {
            return Err(ConfigError::InvalidValue {
                field: "query".to_string(),
                reason: "Revenue days and top restaurants must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ==================== Tests ====================
