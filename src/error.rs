//! Error types for Larder storage.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use larder_core::ValidationError;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by every storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection}: '{key}' not found")]
    NotFound {
        collection: &'static str,
        key: String,
    },

    #[error("invalid entity: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed collection file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {collection}: {source}")]
    Encode {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Every failure met while loading a store, not just the first.
    #[error("failed to load store:\n{}", JoinedErrors(.0))]
    Load(Vec<StoreError>),

    /// Every collection that failed to flush on close.
    #[error("failed to flush store:\n{}", JoinedErrors(.0))]
    Flush(Vec<StoreError>),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("store is closed")]
    Closed,
}

impl StoreError {
    pub(crate) fn not_found(collection: &'static str, key: impl fmt::Display) -> Self {
        StoreError::NotFound {
            collection,
            key: key.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolClosed => StoreError::Closed,
            e => StoreError::Database(e),
        }
    }
}

struct JoinedErrors<'a>(&'a [StoreError]);

impl fmt::Display for JoinedErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}", err)?;
        }
        Ok(())
    }
}
