//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Connection pool sizing is not
//! configurable; see [`crate::persistence::postgres`].

use std::net::SocketAddr;
use std::str::FromStr;

use sqlx::postgres::PgConnectOptions;

use crate::error::TrackerError;

/// Which [`crate::persistence::LogStore`] the binary wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// [`crate::persistence::PostgresGateway`].
    Postgres,
    /// [`crate::persistence::MemoryStore`].
    Memory,
}

impl FromStr for StorageBackend {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(TrackerError::Config(format!(
                "STORAGE_BACKEND must be postgres or memory, got {other:?}"
            ))),
        }
    }
}

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// PostgreSQL connection parameters.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub name: String,
    /// Login role.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Full connection URL; overrides the individual fields when set.
    pub url: Option<String>,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl DatabaseConfig {
    /// Builds sqlx connect options.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Config`] if `url` is set but malformed.
    pub fn connect_options(&self) -> Result<PgConnectOptions, TrackerError> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url)
                .map_err(|e| TrackerError::Config(format!("DATABASE_URL: {e}")));
        }
        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user)
            .password(&self.password))
    }
}

/// Top-level service configuration.
///
/// Loaded once at startup via [`TrackerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Storage connection parameters.
    pub database: DatabaseConfig,

    /// Storage implementation to use.
    pub storage_backend: StorageBackend,

    /// Tracing output format.
    pub log_format: LogFormat,

    /// Seed for deterministic event generation; random when unset.
    pub event_seed: Option<u64>,
}

impl TrackerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file,
    /// then reads the environment through [`TrackerConfig::from_lookup`].
    ///
    /// # Errors
    ///
    /// See [`TrackerConfig::from_lookup`].
    pub fn from_env() -> Result<Self, TrackerError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// | Key               | Default        |
    /// |-------------------|----------------|
    /// | `PORT`            | `3000`         |
    /// | `LISTEN_ADDR`     | `0.0.0.0:PORT` |
    /// | `DB_HOST`         | `localhost`    |
    /// | `DB_PORT`         | `5432`         |
    /// | `DB_NAME`         | `log_tracking` |
    /// | `DB_USER`         | `loguser`      |
    /// | `DB_PASSWORD`     | `logpass`      |
    /// | `DATABASE_URL`    | unset          |
    /// | `STORAGE_BACKEND` | `postgres`     |
    /// | `LOG_FORMAT`      | `text`         |
    /// | `EVENT_SEED`      | unset          |
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Config`] if a typed key is set but cannot be
    /// parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TrackerError> {
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let listen_addr = match lookup("LISTEN_ADDR") {
            Some(addr) => addr
                .parse()
                .map_err(|e| TrackerError::Config(format!("LISTEN_ADDR {addr:?}: {e}")))?,
            None => SocketAddr::from(([0, 0, 0, 0], port)),
        };

        let database = DatabaseConfig {
            host: lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or(&lookup, "DB_PORT", 5432)?,
            name: lookup("DB_NAME").unwrap_or_else(|| "log_tracking".to_string()),
            user: lookup("DB_USER").unwrap_or_else(|| "loguser".to_string()),
            password: lookup("DB_PASSWORD").unwrap_or_else(|| "logpass".to_string()),
            url: lookup("DATABASE_URL").filter(|u| !u.is_empty()),
        };

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => StorageBackend::Postgres,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let event_seed = lookup("EVENT_SEED")
            .map(|seed| {
                seed.parse()
                    .map_err(|e| TrackerError::Config(format!("EVENT_SEED {seed:?}: {e}")))
            })
            .transpose()?;

        Ok(Self {
            listen_addr,
            database,
            storage_backend,
            log_format,
            event_seed,
        })
    }
}

/// Parses `key` as `T`, returning `default` when unset.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, TrackerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| TrackerError::Config(format!("{key} {raw:?}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<TrackerConfig, TrackerError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        TrackerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let Ok(config) = load(&[]) else {
            panic!("defaults should load");
        };
        assert_eq!(config.listen_addr, SocketAddr::from(([0, 0, 0, 0], 3000)));
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.name, "log_tracking");
        assert_eq!(config.database.user, "loguser");
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.event_seed.is_none());
        assert!(config.database.url.is_none());
    }

    #[test]
    fn port_and_listen_addr() {
        let Ok(config) = load(&[("PORT", "8080")]) else {
            panic!("PORT should parse");
        };
        assert_eq!(config.listen_addr.port(), 8080);

        let Ok(config) = load(&[("PORT", "8080"), ("LISTEN_ADDR", "127.0.0.1:9000")]) else {
            panic!("LISTEN_ADDR should parse");
        };
        assert_eq!(config.listen_addr, SocketAddr::from(([127, 0, 0, 1], 9000)));
    }

    #[test]
    fn malformed_values_are_config_errors() {
        assert!(matches!(load(&[("PORT", "eighty")]), Err(TrackerError::Config(_))));
        assert!(matches!(load(&[("DB_PORT", "-1")]), Err(TrackerError::Config(_))));
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "sqlite")]),
            Err(TrackerError::Config(_))
        ));
        assert!(matches!(load(&[("EVENT_SEED", "abc")]), Err(TrackerError::Config(_))));
    }

    #[test]
    fn optional_switches() {
        let Ok(config) = load(&[
            ("STORAGE_BACKEND", "Memory"),
            ("LOG_FORMAT", "json"),
            ("EVENT_SEED", "42"),
        ]) else {
            panic!("switches should parse");
        };
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.event_seed, Some(42));
    }

    #[test]
    fn connect_options_from_url_or_fields() {
        let Ok(config) = load(&[("DATABASE_URL", "postgres://u:p@db:6543/logs")]) else {
            panic!("url should load");
        };
        let Ok(options) = config.database.connect_options() else {
            panic!("url should parse");
        };
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 6543);

        let Ok(config) = load(&[("DATABASE_URL", "not a url")]) else {
            panic!("raw value loads");
        };
        assert!(matches!(
            config.database.connect_options(),
            Err(TrackerError::Config(_))
        ));
    }

    #[test]
    fn debug_output_hides_credentials() {
        let Ok(config) = load(&[("DB_PASSWORD", "hunter2")]) else {
            panic!("defaults should load");
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
