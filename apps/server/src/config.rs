//! Server configuration module.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables.
//!
//! ## Sources
//! ```text
//! defaults (serde)  ◄── config/techstore.toml (optional)  ◄── TECHSTORE__* env
//!
//! TECHSTORE__SERVER__PORT=9000
//! TECHSTORE__DATABASE__PATH=/var/lib/techstore/store.db
//! TECHSTORE__BOOTSTRAP__ADMIN_PASSWORD=change-me-now
//! ```

use std::net::{IpAddr, SocketAddr};

use config::{Config, Environment, File};
use serde::Deserialize;

use techstore_core::MIN_PASSWORD_LENGTH;

/// Default location of the optional config file.
pub const DEFAULT_CONFIG_FILE: &str = "config/techstore";

/// Hard cap on the session log report size.
pub const MAX_SESSION_LOG_LIMIT: u32 = 500;

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpSettings,
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub reports: ReportSettings,
    pub bootstrap: BootstrapSettings,
}

/// Listener address.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub host: String,
    pub port: u16,
    /// Reverse proxies whose `X-Forwarded-For` header is believed. Empty
    /// means the peer address is always recorded.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            host: "127.0.0.1".to_string(),
            port: 8000,
            trusted_proxies: Vec::new(),
        }
    }
}

impl HttpSettings {
    pub fn trusts(&self, peer: IpAddr) -> bool {
        self.trusted_proxies.contains(&peer)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file, created on first start.
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: "./techstore.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Session expiry and cookie flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Seconds a session may sit unused.
    pub idle_timeout_secs: u64,
    /// Seconds a session may live in total.
    pub absolute_timeout_secs: u64,
    /// Sets the `Secure` flag on the session cookie (HTTPS only).
    pub cookie_secure: bool,
    /// Seconds between sweeps that close the log rows of expired sessions.
    pub sweep_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            idle_timeout_secs: 30 * 60,
            absolute_timeout_secs: 8 * 60 * 60,
            cookie_secure: false,
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Rows shown by the session log report when no limit is given.
    pub session_log_limit: u32,
    /// VAT rate in basis points (1500 = 15%). Prices include VAT.
    pub vat_rate_bps: u32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            session_log_limit: 50,
            vat_rate_bps: 1500,
        }
    }
}

/// First administrator, created only when the users table is empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BootstrapSettings {
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl ServerConfig {
    /// Load configuration from `config/techstore.toml` (if present) and
    /// `TECHSTORE__*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Same as [`load`](Self::load) with an explicit file name (extension
    /// optional).
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("TECHSTORE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks values the type system can't.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue("server.port must not be 0".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database.max_connections must be at least 1".into(),
            ));
        }

        if self.session.idle_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "session.idle_timeout_secs must be positive".into(),
            ));
        }

        if self.session.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "session.sweep_interval_secs must be positive".into(),
            ));
        }

        if self.session.idle_timeout_secs > self.session.absolute_timeout_secs {
            return Err(ConfigError::InvalidValue(
                "session.idle_timeout_secs must not exceed session.absolute_timeout_secs".into(),
            ));
        }

        if self.reports.session_log_limit == 0 || self.reports.session_log_limit > MAX_SESSION_LOG_LIMIT {
            return Err(ConfigError::InvalidValue(format!(
                "reports.session_log_limit must be between 1 and {MAX_SESSION_LOG_LIMIT}"
            )));
        }

        if self.reports.vat_rate_bps > 10_000 {
            return Err(ConfigError::InvalidValue(
                "reports.vat_rate_bps must be at most 10000".into(),
            ));
        }

        match (&self.bootstrap.admin_username, &self.bootstrap.admin_password) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConfigError::MissingRequired(
                    "bootstrap.admin_username and bootstrap.admin_password go together".into(),
                ));
            }
            (Some(_), Some(password)) if password.chars().count() < MIN_PASSWORD_LENGTH => {
                return Err(ConfigError::InvalidValue(format!(
                    "bootstrap.admin_password must be at least {MIN_PASSWORD_LENGTH} characters"
                )));
            }
            _ => {}
        }

        Ok(())
    }

    /// Listener address built from `server.host` and `server.port`.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("server.host '{}'", self.server.host)))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        config.validate().unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.path, "./techstore.db");
        assert_eq!(config.session.idle_timeout_secs, 1800);
        assert_eq!(config.session.absolute_timeout_secs, 28_800);
        assert_eq!(config.session.sweep_interval_secs, 60);
        assert!(config.server.trusted_proxies.is_empty());
        assert_eq!(config.reports.session_log_limit, 50);
        assert_eq!(config.reports.vat_rate_bps, 1500);
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:8000");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ServerConfig::load_from("does/not/exist/techstore").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_rejects_idle_longer_than_absolute() {
        let mut config = ServerConfig::default();
        config.session.idle_timeout_secs = 10_000;
        config.session.absolute_timeout_secs = 60;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_rejects_zero_port() {
        let mut config = ServerConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_trusted_proxies() {
        let mut config = ServerConfig::default();
        let proxy: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(!config.server.trusts(proxy));

        config.server.trusted_proxies.push(proxy);
        assert!(config.server.trusts(proxy));
        assert!(!config.server.trusts("10.0.0.3".parse().unwrap()));
    }

    #[test]
    fn test_bootstrap_needs_both_fields() {
        let mut config = ServerConfig::default();
        config.bootstrap.admin_username = Some("admin".into());
        assert!(matches!(config.validate(), Err(ConfigError::MissingRequired(_))));

        config.bootstrap.admin_password = Some("short".into());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        config.bootstrap.admin_password = Some("long-enough-pw".into());
        config.validate().unwrap();
    }
}
