//! Error types for the pathkv-store crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].
//! Malformed paths are not an error: they degrade to whole-record
//! addressing (see [`crate::path`]).

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached. Never retried.
    #[error("connection error: {0}")]
    Connection(String),

    /// A persisted row does not hold valid encoded JSON.
    #[error("stored value for key `{key}` is not valid JSON: {source}")]
    Serialization {
        key: String,
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded for storage.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Postgres query failed.
    #[error("postgres error: {0}")]
    Postgres(sqlx::Error),

    /// The store configuration is invalid or unreadable.
    #[error("config error: {0}")]
    Config(String),

    /// An invalid argument was provided to a store operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io_err) => Self::Connection(io_err.to_string()),
            sqlx::Error::Tls(tls_err) => Self::Connection(tls_err.to_string()),
            sqlx::Error::PoolTimedOut => {
                Self::Connection("connection pool timed out".to_string())
            }
            sqlx::Error::PoolClosed => Self::Connection("connection pool is closed".to_string()),
            other => Self::Postgres(other),
        }
    }
}

impl StoreError {
    /// Whether this error means the backing store was unreachable.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlx_pool_timeout_maps_to_connection() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_connection());
    }

    #[test]
    fn sqlx_row_not_found_stays_query_error() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Postgres(_)));
        assert!(!err.is_connection());
    }

    #[test]
    fn serialization_error_names_key() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = StoreError::Serialization {
            key: "user".into(),
            raw: "{oops".into(),
            source,
        };
        assert!(err.to_string().contains("`user`"));
    }
}
