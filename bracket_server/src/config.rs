//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.
//! Command line flags take precedence over the environment.

use bracket_engine::db::DatabaseConfig;
use std::net::SocketAddr;

/// Default bind address when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Where stages and pipelines are kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// In-process repository; everything is lost on shutdown
    Memory,
    /// PostgreSQL repository
    Postgres(DatabaseConfig),
}

impl Storage {
    pub fn name(&self) -> &'static str {
        match self {
            Storage::Memory => "memory",
            Storage::Postgres(_) => "postgres",
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub storage: Option<String>,
    pub database_url: Option<String>,
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Storage backend
    pub storage: Storage,
    /// Prometheus listener, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from CLI overrides and environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a supplied value cannot be parsed
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        Self::resolve(overrides, |var| std::env::var(var).ok())
    }

    /// Resolve configuration against an arbitrary variable lookup
    pub fn resolve(
        overrides: CliOverrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match overrides.bind.or_else(|| lookup("SERVER_BIND")) {
            Some(value) => parse_addr("SERVER_BIND", &value)?,
            None => parse_addr("SERVER_BIND", DEFAULT_BIND)?,
        };

        let storage_name = overrides
            .storage
            .or_else(|| lookup("STORAGE"))
            .unwrap_or_else(|| "memory".to_string());

        let storage = match storage_name.to_lowercase().as_str() {
            "memory" => Storage::Memory,
            "postgres" | "postgresql" => {
                let config = DatabaseConfig::from_env();
                match overrides.database_url.or_else(|| lookup("DATABASE_URL")) {
                    Some(url) if url.trim().is_empty() => {
                        return Err(ConfigError::MissingRequired {
                            var: "DATABASE_URL".to_string(),
                            hint: "Set a postgres:// connection string".to_string(),
                        });
                    }
                    Some(url) => Storage::Postgres(config.with_url(url)),
                    None => Storage::Postgres(config),
                }
            }
            other => {
                return Err(ConfigError::Invalid {
                    var: "STORAGE".to_string(),
                    reason: format!("unknown storage '{other}', expected memory or postgres"),
                });
            }
        };

        let metrics_bind = lookup("METRICS_BIND")
            .filter(|value| !value.trim().is_empty())
            .map(|value| parse_addr("METRICS_BIND", &value))
            .transpose()?;

        Ok(Self {
            bind,
            storage,
            metrics_bind,
        })
    }
}

fn parse_addr(var: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var: var.to_string(),
        reason: format!("'{value}' is not an IP:PORT address"),
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}. {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}
