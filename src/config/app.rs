//! Main application configuration
//!
//! Configuration loads from defaults, then an optional TOML file, then
//! environment variable overrides, and is validated before any component
//! starts.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub amqp: AmqpSettings,
    pub storage: StorageSettings,
    pub messaging: MessagingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port the gateway HTTP listener binds to
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// AMQP connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmqpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub vhost: String,
    /// Maximum connection retry attempts
    pub max_retries: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
}

/// Tournament storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Postgres connection string; empty selects the in-memory store
    pub database_url: String,
    /// Connection pool size
    pub max_connections: u32,
    /// Capacity assigned to newly created tournaments
    pub max_players: u32,
}

/// Request/reply deadline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingSettings {
    /// Gateway-to-orchestrator request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Orchestrator-to-directory lookup timeout in milliseconds
    pub directory_timeout_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "tourney-hall".to_string(),
            log_level: "info".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for AmqpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5672,
            username: "guest".to_string(),
            password: "guest".to_string(),
            vhost: "/".to_string(),
            max_retries: 5,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: 10,
            max_players: crate::types::DEFAULT_MAX_PLAYERS,
        }
    }
}

impl Default for MessagingSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5000,
            directory_timeout_ms: 2000,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file plus environment
    /// variable overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load configuration from environment variables with fallback to
    /// defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            self.service.http_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // AMQP settings
        if let Ok(host) = env::var("AMQP_HOST") {
            self.amqp.host = host;
        }
        if let Ok(port) = env::var("AMQP_PORT") {
            self.amqp.port = port
                .parse()
                .map_err(|_| anyhow!("Invalid AMQP_PORT value: {}", port))?;
        }
        if let Ok(username) = env::var("AMQP_USERNAME") {
            self.amqp.username = username;
        }
        if let Ok(password) = env::var("AMQP_PASSWORD") {
            self.amqp.password = password;
        }
        if let Ok(vhost) = env::var("AMQP_VHOST") {
            self.amqp.vhost = vhost;
        }
        if let Ok(retries) = env::var("AMQP_MAX_RETRIES") {
            self.amqp.max_retries = retries
                .parse()
                .map_err(|_| anyhow!("Invalid AMQP_MAX_RETRIES value: {}", retries))?;
        }
        if let Ok(delay) = env::var("AMQP_RETRY_DELAY_MS") {
            self.amqp.retry_delay_ms = delay
                .parse()
                .map_err(|_| anyhow!("Invalid AMQP_RETRY_DELAY_MS value: {}", delay))?;
        }

        // Storage settings
        if let Ok(url) = env::var("DATABASE_URL") {
            self.storage.database_url = url;
        }
        if let Ok(max_connections) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.storage.max_connections = max_connections
                .parse()
                .map_err(|_| anyhow!("Invalid DATABASE_MAX_CONNECTIONS value: {}", max_connections))?;
        }
        if let Ok(max_players) = env::var("TOURNAMENT_MAX_PLAYERS") {
            self.storage.max_players = max_players
                .parse()
                .map_err(|_| anyhow!("Invalid TOURNAMENT_MAX_PLAYERS value: {}", max_players))?;
        }

        // Messaging deadlines
        if let Ok(timeout) = env::var("REQUEST_TIMEOUT_MS") {
            self.messaging.request_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid REQUEST_TIMEOUT_MS value: {}", timeout))?;
        }
        if let Ok(timeout) = env::var("DIRECTORY_TIMEOUT_MS") {
            self.messaging.directory_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid DIRECTORY_TIMEOUT_MS value: {}", timeout))?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get the gateway request deadline as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.messaging.request_timeout_ms)
    }

    /// Get the directory lookup deadline as Duration
    pub fn directory_timeout(&self) -> Duration {
        Duration::from_millis(self.messaging.directory_timeout_ms)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    if config.amqp.host.is_empty() {
        return Err(anyhow!("AMQP host cannot be empty"));
    }
    if config.amqp.port == 0 {
        return Err(anyhow!("AMQP port cannot be 0"));
    }

    if config.storage.max_connections == 0 {
        return Err(anyhow!("Database pool size must be greater than 0"));
    }
    if config.storage.max_players == 0 {
        return Err(anyhow!("Tournament capacity must be greater than 0"));
    }

    if config.messaging.request_timeout_ms == 0 {
        return Err(anyhow!("Request timeout must be greater than 0"));
    }
    if config.messaging.directory_timeout_ms == 0 {
        return Err(anyhow!("Directory timeout must be greater than 0"));
    }
    // The directory hop happens inside the gateway request window; an equal
    // or larger deadline would always let the outer request expire first.
    if config.messaging.directory_timeout_ms >= config.messaging.request_timeout_ms {
        return Err(anyhow!(
            "Directory timeout ({}ms) must be below the request timeout ({}ms)",
            config.messaging.directory_timeout_ms,
            config.messaging.request_timeout_ms
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.messaging.request_timeout_ms, 5000);
        assert_eq!(config.messaging.directory_timeout_ms, 2000);
        assert_eq!(config.storage.max_players, 4);
    }

    #[test]
    fn directory_deadline_must_sit_inside_the_request_deadline() {
        let mut config = AppConfig::default();
        config.messaging.directory_timeout_ms = config.messaging.request_timeout_ms;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut config = AppConfig::default();
        config.storage.max_players = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let mut config = AppConfig::default();
        config.service.log_level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn toml_sections_deserialize_with_partial_keys() {
        let config: AppConfig = toml::from_str(
            r#"
            [service]
            http_port = 9090

            [messaging]
            request_timeout_ms = 8000
            "#,
        )
        .unwrap();
        assert_eq!(config.service.http_port, 9090);
        assert_eq!(config.messaging.request_timeout_ms, 8000);
        // Untouched sections keep their defaults.
        assert_eq!(config.amqp.port, 5672);
        assert_eq!(config.messaging.directory_timeout_ms, 2000);
    }
}
