use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Database URL. Without it annotations live in memory only.
    pub db_url: Option<String>,

    /// JWT secret key used to sign login tokens
    pub auth_jwt_secret: Option<String>,

    /// Lifetime of issued login tokens
    #[serde(default = "default_token_ttl_secs")]
    pub auth_token_ttl_secs: u64,

    /// bcrypt work factor for password hashes
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Directory uploaded documents are written to
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Maximum accepted upload body
    #[serde(default = "default_upload_max_bytes")]
    pub upload_max_bytes: usize,

    /// Absolute base used to build upload URLs (e.g. https://viewer.example.com)
    pub public_base_url: Option<String>,

    /// Attempts per durable annotation write
    #[serde(default = "default_persist_max_attempts")]
    pub persist_max_attempts: u32,

    /// Linear backoff unit between write attempts
    #[serde(default = "default_persist_retry_backoff_ms")]
    pub persist_retry_backoff_ms: u64,

    /// Upper bound on cached room states
    #[serde(default = "default_room_state_max_capacity")]
    pub room_state_max_capacity: u64,

    /// Optional idle expiry for cached room states
    pub room_state_idle_secs: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "prod" || self.environment.to_lowercase() == "production"
    }

    /// Allowed CORS origins, empty when none are configured
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn persist_backoff(&self) -> Duration {
        Duration::from_millis(self.persist_retry_backoff_ms)
    }

    pub fn room_state_idle(&self) -> Option<Duration> {
        self.room_state_idle_secs.map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            cors_origins: None,
            db_url: None,
            auth_jwt_secret: None,
            auth_token_ttl_secs: default_token_ttl_secs(),
            bcrypt_cost: default_bcrypt_cost(),
            upload_dir: default_upload_dir(),
            upload_max_bytes: default_upload_max_bytes(),
            public_base_url: None,
            persist_max_attempts: default_persist_max_attempts(),
            persist_retry_backoff_ms: default_persist_retry_backoff_ms(),
            room_state_max_capacity: default_room_state_max_capacity(),
            room_state_idle_secs: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_token_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_upload_max_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_persist_max_attempts() -> u32 {
    3
}

fn default_persist_retry_backoff_ms() -> u64 {
    200
}

fn default_room_state_max_capacity() -> u64 {
    100_000
}
