//! Networked backend over an `sqlx` Postgres pool.
//!
//! The pool connects lazily, so construction never touches the network;
//! the first query (normally [`Backend::init_schema`]) does. Every query
//! acquires a pooled connection and releases it when done.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::{debug, info, instrument};

use super::{Backend, validate_table_name};
use crate::config::PostgresConfig;
use crate::error::StoreResult;

/// Pool size used when none is configured.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// One Postgres table holding `(key, value)` rows.
#[derive(Clone)]
pub struct PostgresBackend {
    pool: PgPool,
    statements: Statements,
}

impl PostgresBackend {
    /// Build a lazily connecting pool from `config`.
    pub fn connect_lazy(config: &PostgresConfig) -> StoreResult<Self> {
        validate_table_name(&config.table)?;
        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            table = %config.table,
            "configuring postgres pool"
        );
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy_with(connect_options(config));
        Ok(Self::with_pool(pool, &config.table))
    }

    /// Use an existing pool. `table` must already be validated.
    fn with_pool(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            statements: Statements::for_table(table),
        }
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn connect_options(config: &PostgresConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
}

/// SQL text for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Statements {
    create: String,
    select: String,
    upsert: String,
    delete: String,
    scan: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        Self {
            create: format!("CREATE TABLE IF NOT EXISTS {table} (key TEXT PRIMARY KEY, value TEXT)"),
            select: format!("SELECT value FROM {table} WHERE key = $1"),
            upsert: format!(
                "INSERT INTO {table} (key, value) VALUES ($1, $2) \
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value"
            ),
            delete: format!("DELETE FROM {table} WHERE key = $1"),
            scan: format!("SELECT key, value FROM {table} ORDER BY key"),
        }
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn init_schema(&self) -> StoreResult<()> {
        sqlx::query(&self.statements.create)
            .execute(&self.pool)
            .await?;
        info!("postgres schema ready");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load(&self, key: &str) -> StoreResult<Option<String>> {
        let row: Option<Option<String>> = sqlx::query_scalar(&self.statements.select)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|v| v.unwrap_or_else(|| "null".to_string())))
    }

    #[instrument(skip(self, value))]
    async fn upsert(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(&self.statements.upsert)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        debug!("row upserted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> StoreResult<bool> {
        let result = sqlx::query(&self.statements.delete)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn scan(&self) -> StoreResult<Vec<(String, String)>> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(&self.statements.scan)
            .fetch_all(&self.pool)
            .await?;
        debug!(rows = rows.len(), "postgres scan complete");
        Ok(rows
            .into_iter()
            .map(|(k, v)| (k, v.unwrap_or_else(|| "null".to_string())))
            .collect())
    }
}

// ── tests ────────────────────────────────────────────────────────────
