//! # Server Configuration
//!
//! Command-line flags with environment fallbacks. The database may be given
//! as a single `DATABASE_URL` or as `DB_HOST`/`DB_PORT`/`DB_USER`/
//! `DB_PASSWORD`/`DB_NAME` parts; with neither, the service runs on the
//! in-memory store.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Configuration errors detected before the server starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid DATABASE_URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("DB_HOST is set but {0} is missing")]
    IncompleteDatabaseParts(&'static str),
}

/// Reviewer service configuration.
#[derive(Parser, Clone)]
#[command(name = "revas-api", version, about = "Reviewer assignment HTTP service")]
pub struct ServerArgs {
    /// Address to listen on.
    #[arg(long, env = "HTTP_ADDRESS", default_value = "0.0.0.0:8080")]
    pub http_address: SocketAddr,

    /// Per-request timeout in seconds.
    #[arg(long, env = "HTTP_TIMEOUT", default_value_t = 10)]
    pub http_timeout: u64,

    /// Seconds to wait for in-flight requests on shutdown.
    #[arg(long, env = "HTTP_IDLE_TIMEOUT", default_value_t = 60)]
    pub http_idle_timeout: u64,

    /// Full Postgres connection URL. Takes precedence over the DB_* parts.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    #[arg(long, env = "DB_PASSWORD")]
    pub db_password: Option<String>,

    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// Connection pool size.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    /// Fixed seed for reviewer selection; random when unset.
    #[arg(long, env = "REVIEWER_SEED")]
    pub reviewer_seed: Option<u64>,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl ServerArgs {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.http_idle_timeout)
    }

    /// Postgres connection options, or `None` for in-memory mode.
    pub fn db_connect_options(&self) -> Result<Option<PgConnectOptions>, ConfigError> {
        if let Some(url) = &self.database_url {
            return PgConnectOptions::from_str(url)
                .map(Some)
                .map_err(|e| ConfigError::InvalidDatabaseUrl(e.to_string()));
        }
        let Some(host) = &self.db_host else {
            return Ok(None);
        };
        let user = self
            .db_user
            .as_deref()
            .ok_or(ConfigError::IncompleteDatabaseParts("DB_USER"))?;
        let name = self
            .db_name
            .as_deref()
            .ok_or(ConfigError::IncompleteDatabaseParts("DB_NAME"))?;

        let mut options = PgConnectOptions::new()
            .host(host)
            .port(self.db_port)
            .username(user)
            .database(name);
        if let Some(password) = &self.db_password {
            options = options.password(password);
        }
        Ok(Some(options))
    }
}

impl std::fmt::Debug for ServerArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerArgs")
            .field("http_address", &self.http_address)
            .field("http_timeout", &self.http_timeout)
            .field("http_idle_timeout", &self.http_idle_timeout)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("db_host", &self.db_host)
            .field("db_port", &self.db_port)
            .field("db_user", &self.db_user)
            .field(
                "db_password",
                &self.db_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("db_name", &self.db_name)
            .field("db_max_connections", &self.db_max_connections)
            .field("reviewer_seed", &self.reviewer_seed)
            .field("log_format", &self.log_format)
            .finish()
    }
}
