//! Environment-driven settings and backend selection.
//!
//! # Invariants
//! - Production never falls back to a built-in secret or database path.
//! - Settings are read once at process start; nothing here re-reads the
//!   environment later.

use crate::auth::token::{JwtTokens, TokenError, DEFAULT_TOKEN_TTL_SECS};
use crate::logging::default_log_level;
use crate::repo::{MemoryRepository, RepoResult, Repository, SqliteRepository};
use log::info;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

const DEV_DATABASE_PATH: &str = "development.db";
const DEV_JWT_SECRET: &str = "hbnb-development-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown ENV `{0}`; expected development|testing|production")]
    UnknownEnv(String),
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{var} must be a positive integer, got `{value}`")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Testing,
    Production,
}

impl AppEnv {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "development" | "dev" => Ok(Self::Development),
            "testing" | "test" => Ok(Self::Testing),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::UnknownEnv(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Production => "production",
        }
    }
}

impl Display for AppEnv {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub env: AppEnv,
    /// SQLite file outside `testing`; optional JSON snapshot inside it.
    pub database_path: Option<PathBuf>,
    pub jwt_secret: String,
    pub jwt_ttl_secs: u64,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("env", &self.env)
            .field("database_path", &self.database_path)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_ttl_secs", &self.jwt_ttl_secs)
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let env = match read("ENV") {
            Some(value) => AppEnv::parse(&value)?,
            None => AppEnv::Development,
        };

        let database_path = match (read("DATABASE_PATH"), env) {
            (Some(path), _) => Some(PathBuf::from(path)),
            (None, AppEnv::Development) => Some(PathBuf::from(DEV_DATABASE_PATH)),
            (None, AppEnv::Testing) => None,
            (None, AppEnv::Production) => return Err(ConfigError::Missing("DATABASE_PATH")),
        };

        let jwt_secret = match (read("JWT_SECRET_KEY"), env) {
            (Some(secret), _) => secret,
            (None, AppEnv::Production) => return Err(ConfigError::Missing("JWT_SECRET_KEY")),
            (None, _) => DEV_JWT_SECRET.to_string(),
        };

        let jwt_ttl_secs = match read("JWT_TTL_SECS") {
            Some(value) => parse_positive("JWT_TTL_SECS", &value)?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };

        Ok(Self {
            env,
            database_path,
            jwt_secret,
            jwt_ttl_secs,
            log_level: read("LOG_LEVEL").unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read("LOG_DIR").map(PathBuf::from),
        })
    }

    pub fn token_issuer(&self) -> Result<JwtTokens, TokenError> {
        JwtTokens::new(&self.jwt_secret, self.jwt_ttl_secs)
    }
}

/// Opens the repository backend selected by `settings.env`.
pub fn open_repository(settings: &Settings) -> RepoResult<Arc<dyn Repository>> {
    let repo: Arc<dyn Repository> = match (settings.env, &settings.database_path) {
        (AppEnv::Testing, None) => Arc::new(MemoryRepository::new()),
        (AppEnv::Testing, Some(path)) => Arc::new(MemoryRepository::open_snapshot(path)?),
        (_, Some(path)) => Arc::new(SqliteRepository::open(path)?),
        (_, None) => Arc::new(SqliteRepository::open_in_memory()?),
    };
    info!(
        "event=repo_open module=config status=ok env={} backend={}",
        settings.env,
        match settings.env {
            AppEnv::Testing => "memory",
            AppEnv::Development | AppEnv::Production => "sqlite",
        }
    );
    Ok(repo)
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        }),
    }
}
