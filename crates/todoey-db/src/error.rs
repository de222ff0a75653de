//! # Store Error Types
//!
//! Error types for store, query and configuration operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)    ValidationError / CoreError (core)      │
//! │       │                               │                                 │
//! │       └───────────────┬───────────────┘                                 │
//! │                       ▼                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller (UI layer) decides what to show                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use todoey_core::{CategoryId, CoreError, ValidationError};

/// Store operation errors.
///
/// Every failure is returned to the caller. A write that fails is rolled
/// back as a whole.
#[derive(Debug, Error)]
pub enum DbError {
    /// The owning category of an item does not exist.
    ///
    /// ## When This Occurs
    /// - `create_item` with a stale category identity
    /// - Observing the items of a deleted category
    #[error("Category not found: {category}")]
    OwnerNotFound { category: CategoryId },

    /// A record identity did not resolve.
    ///
    /// ## When This Occurs
    /// - `set_done`, rename or delete on a stale identity
    #[error("{entity} not found: {id}")]
    RecordNotFound { entity: String, id: String },

    /// The store file could not be opened or migrated.
    ///
    /// ## When This Occurs
    /// - File permissions issue
    /// - Disk full
    /// - Migration failed
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Another write transaction holds the writer lock.
    #[error("Another write transaction is in progress")]
    TransactionConflict,

    /// A query specification doesn't fit its scope or row type.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Input failed validation before any transaction opened.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Runtime SQL error.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Config file could not be read or parsed.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Config file could not be written.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// Internal store error.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a RecordNotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::RecordNotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Returns true for errors caused by a stale identity.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DbError::RecordNotFound { .. } | DbError::OwnerNotFound { .. }
        )
    }

    /// Returns true for configuration errors.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DbError::InvalidConfig(_) | DbError::ConfigLoadFailed(_) | DbError::ConfigSaveFailed(_)
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::RecordNotFound
/// sqlx::Error::Database       → DbError::QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::StoreUnavailable
/// sqlx::Error::PoolClosed     → DbError::StoreUnavailable
/// sqlx::Error::Io             → DbError::StoreUnavailable
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => {
                DbError::StoreUnavailable("Timed out waiting for a connection".to_string())
            }
            sqlx::Error::PoolClosed => DbError::StoreUnavailable("Pool is closed".to_string()),
            sqlx::Error::Io(io_err) => DbError::StoreUnavailable(io_err.to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::StoreUnavailable(format!("Migration failed: {}", err))
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for DbError {
    fn from(err: toml::de::Error) -> Self {
        DbError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for DbError {
    fn from(err: toml::ser::Error) -> Self {
        DbError::ConfigSaveFailed(err.to_string())
    }
}

/// Query spec errors surface as `InvalidQuery`, validation errors keep
/// their own variant.
impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => DbError::Validation(v),
            other => DbError::InvalidQuery(other.to_string()),
        }
    }
}

/// Result type for store operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_helpers() {
        let err = DbError::not_found("Item", "abc");
        assert_eq!(err.to_string(), "Item not found: abc");
        assert!(err.is_not_found());

        let err = DbError::OwnerNotFound {
            category: CategoryId::from("c-1"),
        };
        assert!(err.is_not_found());
        assert!(!DbError::TransactionConflict.is_not_found());
    }

    #[test]
    fn test_core_error_mapping() {
        let err: DbError = CoreError::SortNotApplicable {
            field: "title".to_string(),
            scope: "all categories".to_string(),
        }
        .into();
        assert!(matches!(err, DbError::InvalidQuery(_)));

        let err: DbError = CoreError::Validation(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        })
        .into();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[test]
    fn test_config_errors_are_categorised() {
        let err: DbError = toml::from_str::<toml::Value>("= broken").unwrap_err().into();
        assert!(err.is_config_error());
        assert!(!DbError::TransactionConflict.is_config_error());
    }

    #[test]
    fn test_row_not_found_maps_to_record_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }
}
