//! # Storage Errors
//!
//! What can go wrong below the ledgers, classified so that the engine can
//! tell a caller mistake (duplicate SKU, dangling reference, negative stock
//! slipping past validation) from a broken database.
//!
//! ```text
//! sqlx::Error ──From──► DbError ──From──► LedgerError ──► ErrorResponse
//!                        │
//!                        ├─ constraint kinds  → reported as ValidationError
//!                        ├─ NotFound          → reported as NotFound
//!                        └─ everything else   → Internal, message withheld
//! ```

use sqlx::error::ErrorKind as SqlxErrorKind;
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// A row addressed by id is missing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `field` is the `table.column` SQLite names, e.g. `products.sku`.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A referenced branch, product, customer... does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A CHECK or NOT NULL rule of the schema rejected the row.
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// BEGIN/COMMIT failed, or a conditional write lost a race.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// A unique violation with the offending value filled in.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for the constraint kinds, which point at bad input rather than
    /// a storage failure.
    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            DbError::UniqueViolation { .. }
                | DbError::ForeignKeyViolation { .. }
                | DbError::CheckViolation { .. }
        )
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    // "UNIQUE constraint failed: products.sku"
                    SqlxErrorKind::UniqueViolation => DbError::UniqueViolation {
                        field: message
                            .rsplit(": ")
                            .next()
                            .unwrap_or("unknown")
                            .to_string(),
                        value: "unknown".to_string(),
                    },
                    SqlxErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    SqlxErrorKind::CheckViolation | SqlxErrorKind::NotNullViolation => {
                        DbError::CheckViolation { message }
                    }
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(!err.is_constraint());
    }

    #[test]
    fn test_pool_errors() {
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::PoolExhausted));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::ConnectionFailed(_)
        ));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            DbError::not_found("Stock", "STK-1").to_string(),
            "Stock not found: STK-1"
        );
        let dup = DbError::duplicate("products.sku", "COKE");
        assert_eq!(dup.to_string(), "Duplicate products.sku: 'COKE' already exists");
        assert!(dup.is_constraint());
    }
}
