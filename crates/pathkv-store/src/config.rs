//! Store configuration.
//!
//! Loaded from TOML, for example:
//!
//! ```toml
//! preload = true
//!
//! [backend]
//! kind = "postgres"
//! table = "userinfo"
//! user = "postgres"
//! database = "pathkv"
//! host = "localhost"
//! password = "secret"
//! # port = 5432
//! ```
//!
//! `PATHKV_PG_PASSWORD`, when set, overrides the Postgres password so it
//! can stay out of the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::postgres::DEFAULT_MAX_CONNECTIONS;
use crate::backend::validate_table_name;
use crate::error::{StoreError, StoreResult};

/// Environment variable overriding [`PostgresConfig::password`].
pub const PASSWORD_ENV: &str = "PATHKV_PG_PASSWORD";

/// Top-level configuration for a [`crate::PathStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Which backing store to use and how to reach it.
    pub backend: BackendConfig,
    /// Load every row into the cache mirror during `init`.
    #[serde(default)]
    pub preload: bool,
}

/// Backend selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Embedded file-backed SQLite database.
    Sqlite {
        path: PathBuf,
        table: String,
    },
    /// Networked Postgres server.
    Postgres(PostgresConfig),
}

/// Connection settings for the Postgres backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub table: String,
    pub user: String,
    pub database: String,
    pub host: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_port() -> u16 {
    5432
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl StoreConfig {
    /// SQLite at `path`, without preloading.
    pub fn sqlite(path: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig::Sqlite {
                path: path.into(),
                table: table.into(),
            },
            preload: false,
        }
    }

    /// Parse and validate a TOML document. No environment overrides.
    pub fn from_toml_str(content: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| StoreError::Config(format!("failed to parse TOML config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, apply environment overrides, and validate.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides(std::env::var(PASSWORD_ENV).ok());
        info!(path = %path.display(), backend = config.backend.kind(), "configuration loaded");
        Ok(config)
    }

    /// Replace the Postgres password with `password` when present.
    pub fn apply_env_overrides(&mut self, password: Option<String>) {
        if let (BackendConfig::Postgres(pg), Some(password)) = (&mut self.backend, password) {
            debug!(var = PASSWORD_ENV, "postgres password taken from environment");
            pg.password = password;
        }
    }

    /// Check fields that serde cannot.
    pub fn validate(&self) -> StoreResult<()> {
        validate_table_name(self.backend.table())?;
        if let BackendConfig::Postgres(pg) = &self.backend {
            if pg.host.is_empty() {
                return Err(StoreError::Config("postgres host must not be empty".into()));
            }
            if pg.max_connections == 0 {
                return Err(StoreError::Config(
                    "postgres max_connections must be at least 1".into(),
                ));
            }
        }
        Ok(())
    }
}

impl BackendConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sqlite { .. } => "sqlite",
            Self::Postgres(_) => "postgres",
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Self::Sqlite { table, .. } => table,
            Self::Postgres(pg) => &pg.table,
        }
    }
}
