//! Configuration management
//!
//! Settings are read from `config.yml` and may be overridden by
//! `INFORM_AGENCY_*` environment variables. Missing values fall back to
//! defaults, so an absent or empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::models::MAX_PER_PAGE;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Login session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Page sizes for list pages
    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
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
    8000
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/inform_agency.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Login session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in days
    #[serde(default = "default_expiration_days")]
    pub expiration_days: i64,
    /// Add the `Secure` attribute to the session cookie
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiration_days: default_expiration_days(),
            secure_cookie: false,
        }
    }
}

fn default_expiration_days() -> i64 {
    14
}

/// Number of records per list page, per entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub topics: u32,
    #[serde(default = "default_page_size")]
    pub newspapers: u32,
    #[serde(default = "default_page_size")]
    pub redactors: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            topics: default_page_size(),
            newspapers: default_page_size(),
            redactors: default_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    3
}

impl PaginationConfig {
    /// Keep every page size within `1..=MAX_PER_PAGE`.
    fn normalize(&mut self) {
        self.topics = self.topics.clamp(1, MAX_PER_PAGE);
        self.newspapers = self.newspapers.clamp(1, MAX_PER_PAGE);
        self.redactors = self.redactors.clamp(1, MAX_PER_PAGE);
    }
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or blank file yields the default configuration; invalid
    /// YAML is reported with its line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;
        config.pagination.normalize();

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - INFORM_AGENCY_SERVER_HOST
    /// - INFORM_AGENCY_SERVER_PORT
    /// - INFORM_AGENCY_DATABASE_DRIVER
    /// - INFORM_AGENCY_DATABASE_URL
    /// - INFORM_AGENCY_SESSION_EXPIRATION_DAYS
    /// - INFORM_AGENCY_SESSION_SECURE_COOKIE
    /// - INFORM_AGENCY_PAGINATION_TOPICS
    /// - INFORM_AGENCY_PAGINATION_NEWSPAPERS
    /// - INFORM_AGENCY_PAGINATION_REDACTORS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.pagination.normalize();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("INFORM_AGENCY_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("INFORM_AGENCY_SERVER_PORT") {
            self.server.port = port;
        }

        if let Ok(driver) = std::env::var("INFORM_AGENCY_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("INFORM_AGENCY_DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(days) = env_parse::<i64>("INFORM_AGENCY_SESSION_EXPIRATION_DAYS") {
            self.session.expiration_days = days;
        }
        if let Some(secure) = env_parse::<bool>("INFORM_AGENCY_SESSION_SECURE_COOKIE") {
            self.session.secure_cookie = secure;
        }

        if let Some(size) = env_parse::<u32>("INFORM_AGENCY_PAGINATION_TOPICS") {
            self.pagination.topics = size;
        }
        if let Some(size) = env_parse::<u32>("INFORM_AGENCY_PAGINATION_NEWSPAPERS") {
            self.pagination.newspapers = size;
        }
        if let Some(size) = env_parse::<u32>("INFORM_AGENCY_PAGINATION_REDACTORS") {
            self.pagination.redactors = size;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test module that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "INFORM_AGENCY_SERVER_HOST",
    "INFORM_AGENCY_SERVER_PORT",
    "INFORM_AGENCY_DATABASE_DRIVER",
    "INFORM_AGENCY_DATABASE_URL",
    "INFORM_AGENCY_SESSION_EXPIRATION_DAYS",
    "INFORM_AGENCY_SESSION_SECURE_COOKIE",
    "INFORM_AGENCY_PAGINATION_TOPICS",
    "INFORM_AGENCY_PAGINATION_NEWSPAPERS",
    "INFORM_AGENCY_PAGINATION_REDACTORS",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_strategy() -> impl Strategy<Value = Config> {
        (
            "[a-z][a-z0-9]{0,10}",
            1u16..=65535,
            prop_oneof![Just(DatabaseDriver::Sqlite), Just(DatabaseDriver::Mysql)],
            1i64..=365,
            any::<bool>(),
            (1u32..=50, 1u32..=50, 1u32..=50),
        )
            .prop_map(|(host, port, driver, days, secure, (t, n, r))| Config {
                server: ServerConfig { host, port },
                database: DatabaseConfig {
                    driver,
                    url: "data/test.db".to_string(),
                },
                session: SessionConfig {
                    expiration_days: days,
                    secure_cookie: secure,
                },
                pagination: PaginationConfig {
                    topics: t,
                    newspapers: n,
                    redactors: r,
                },
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// A serialized configuration loads back with identical values.
        #[test]
        fn prop_config_yaml_roundtrip(config in config_strategy()) {
            let yaml = serde_yaml::to_string(&config).unwrap();
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "{}", yaml).unwrap();

            let loaded = Config::load(file.path()).unwrap();
            prop_assert_eq!(loaded.server.host, config.server.host);
            prop_assert_eq!(loaded.server.port, config.server.port);
            prop_assert_eq!(loaded.database.driver, config.database.driver);
            prop_assert_eq!(loaded.session.expiration_days, config.session.expiration_days);
            prop_assert_eq!(loaded.pagination.topics, config.pagination.topics);
            prop_assert_eq!(loaded.pagination.newspapers, config.pagination.newspapers);
            prop_assert_eq!(loaded.pagination.redactors, config.pagination.redactors);
        }

        /// Page sizes are never zero after loading.
        #[test]
        fn prop_page_sizes_positive(t in 0u32..5, n in 0u32..5, r in 0u32..5) {
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "pagination:\n  topics: {}\n  newspapers: {}\n  redactors: {}\n", t, n, r).unwrap();

            let loaded = Config::load(file.path()).unwrap();
            prop_assert!(loaded.pagination.topics >= 1);
            prop_assert!(loaded.pagination.newspapers >= 1);
            prop_assert!(loaded.pagination.redactors >= 1);
        }
    }
}
