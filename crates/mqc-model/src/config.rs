//! Process-wide database configuration (spec §6), modeled on
//! `octofhir_db_postgres::config::PostgresConfig`: a `serde`-derived struct
//! with builder methods, a `Default` carrying the teacher's documented
//! fallbacks, and a fallible `from_env()`.

use serde::{Deserialize, Serialize};

/// Connection parameters plus pool sizing, assembled into a single
/// connection URL at [`DbConfig::url`] time rather than stored as one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_size: u32,
    pub connect_timeout_ms: u64,
    pub idle_timeout_ms: Option<u64>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "mqc".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            pool_size: 10,
            connect_timeout_ms: 5_000,
            idle_timeout_ms: Some(300_000),
        }
    }
}

impl DbConfig {
    #[must_use]
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    #[must_use]
    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    #[must_use]
    pub fn with_idle_timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.idle_timeout_ms = ms;
        self
    }

    /// Reads `MQC_DB_HOST`, `MQC_DB_PORT`, `MQC_DB_NAME`, `MQC_DB_USER`,
    /// `MQC_DB_PASSWORD`, `MQC_DB_POOL_SIZE`, `MQC_DB_CONNECT_TIMEOUT_MS`,
    /// and `MQC_DB_IDLE_TIMEOUT_MS`, falling back to [`Default`] for any
    /// variable that is unset. Plain `std::env::var` reads rather than a
    /// struct-deserializing crate — there is nothing in the teacher's
    /// dependency tree for that beyond `dotenvy`, which only loads `.env`
    /// files into the process environment, not into a typed struct.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("MQC_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("MQC_DB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            database: std::env::var("MQC_DB_NAME").unwrap_or(defaults.database),
            user: std::env::var("MQC_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("MQC_DB_PASSWORD").unwrap_or(defaults.password),
            pool_size: std::env::var("MQC_DB_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.pool_size),
            connect_timeout_ms: std::env::var("MQC_DB_CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.connect_timeout_ms),
            idle_timeout_ms: std::env::var("MQC_DB_IDLE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(defaults.idle_timeout_ms),
        }
    }

    /// Assembles the `postgres://` connection URL used by [`crate::pool`].
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_fallbacks() {
        let cfg = DbConfig::default();
        assert_eq!(cfg.pool_size, 10);
        assert_eq!(cfg.connect_timeout_ms, 5_000);
        assert_eq!(cfg.idle_timeout_ms, Some(300_000));
    }

    #[test]
    fn builder_methods_override_fields() {
        let cfg = DbConfig::new("db.internal", "orders")
            .with_port(6543)
            .with_user("svc")
            .with_password("hunter2")
            .with_pool_size(25);
        assert_eq!(cfg.host, "db.internal");
        assert_eq!(cfg.database, "orders");
        assert_eq!(cfg.port, 6543);
        assert_eq!(cfg.pool_size, 25);
    }

    #[test]
    fn url_assembles_from_fields() {
        let cfg = DbConfig::new("localhost", "mqc").with_user("postgres");
        assert_eq!(cfg.url(), "postgres://postgres:@localhost:5432/mqc");
    }
}
