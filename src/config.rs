//! Application configuration loaded from environment variables.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Persistence ===
    /// Postgres connection string.
    pub database_url: String,

    /// Maximum pool connections.
    #[serde(default = "default_max_connections")]
    pub max_db_connections: u32,

    // === Session Engine ===
    /// Minutes of inactivity after which a session expires.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: u64,

    /// Seconds between expiry sweeps of the session store.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,

    /// How many past BMI records the history menu shows.
    #[serde(default = "default_history_limit")]
    pub history_limit: i64,

    /// Use the legacy full-sequence input parsing instead of taking the
    /// final `*`-delimited segment.
    #[serde(default)]
    pub legacy_input_parsing: bool,

    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_session_ttl() -> u64 {
    30
}

fn default_sweep_interval() -> u64 {
    120
}

fn default_history_limit() -> i64 {
    3
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.is_empty() {
            return Err("DATABASE_URL is required".to_string());
        }

        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err("DATABASE_URL must be a postgres:// URL".to_string());
        }

        if self.session_ttl_minutes == 0 {
            return Err("SESSION_TTL_MINUTES must be at least 1".to_string());
        }

        if self.history_limit < 1 {
            return Err("HISTORY_LIMIT must be at least 1".to_string());
        }

        Ok(())
    }

    /// Session TTL as a duration.
    pub fn session_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_ttl_minutes * 60)
    }

    /// Sweep interval as a duration.
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_seconds)
    }
}
