//! # Ledger Error Types
//!
//! The error every engine operation returns, and the `{kind, message}` shape
//! it takes when it leaves the engine.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Almacen                                │
//! │                                                                         │
//! │  almacen-core rule ── CoreError ──────────┐                             │
//! │                                           │                             │
//! │  almacen-db query ─── DbError ────────────┼──► LedgerError              │
//! │                                           │        │                    │
//! │  config loading ───── Config/Load ────────┘        ▼                    │
//! │                                              ErrorResponse              │
//! │                                              { kind, message }          │
//! │                                                                         │
//! │  Business errors keep their message verbatim. Storage failures are     │
//! │  logged with `error!` and replaced by a generic message.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! ```json
//! {
//!   "kind": "InsufficientStock",
//!   "message": "Insufficient stock for product PRD-1 at branch BR-A: available 3, requested 5"
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use almacen_core::{CoreError, ErrorKind, ValidationError};
use almacen_db::DbError;

/// Result type alias for engine operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A business rule or validation failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A storage failure.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The configuration is well-formed but not usable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read or parsed.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// The configuration file could not be written.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Core(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for LedgerError {
    fn from(err: toml::ser::Error) -> Self {
        LedgerError::ConfigSaveFailed(err.to_string())
    }
}

impl LedgerError {
    /// Shorthand for a `NotFound` business error.
    pub fn not_found(entity: &str, id: &str) -> Self {
        LedgerError::Core(CoreError::not_found(entity, id))
    }

    /// The stable kind of this error.
    ///
    /// ```text
    /// Core(e)                           → e.kind()
    /// Db(NotFound)                      → NotFound
    /// Db(Unique | ForeignKey | Check)   → ValidationError
    /// Db(anything else), Config*        → Internal
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Core(e) => e.kind(),
            LedgerError::Db(DbError::NotFound { .. }) => ErrorKind::NotFound,
            LedgerError::Db(e) if e.is_constraint() => ErrorKind::ValidationError,
            LedgerError::Db(_)
            | LedgerError::InvalidConfig(_)
            | LedgerError::ConfigLoadFailed(_)
            | LedgerError::ConfigSaveFailed(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidConfig(_)
                | LedgerError::ConfigLoadFailed(_)
                | LedgerError::ConfigSaveFailed(_)
        )
    }
}

// =============================================================================
// Boundary Shape
// =============================================================================

/// What a caller of the engine receives when an operation fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable kind for programmatic handling.
    pub kind: ErrorKind,

    /// Human-readable message for display.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ErrorResponse {
            kind,
            message: message.into(),
        }
    }

    /// Transport status for the boundary layer.
    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }
}

impl From<LedgerError> for ErrorResponse {
    fn from(err: LedgerError) -> Self {
        let kind = err.kind();
        match err {
            LedgerError::Core(e) => ErrorResponse::new(kind, e.to_string()),
            LedgerError::Db(e) => match e {
                DbError::NotFound { .. } | DbError::UniqueViolation { .. } => {
                    ErrorResponse::new(kind, e.to_string())
                }
                DbError::ForeignKeyViolation { message } => {
                    error!("Foreign key violation: {}", message);
                    ErrorResponse::new(kind, "Invalid reference")
                }
                DbError::CheckViolation { message } => {
                    error!("Check constraint violation: {}", message);
                    ErrorResponse::new(kind, "Value out of range")
                }
                DbError::TransactionFailed(message) => {
                    error!("Transaction failed: {}", message);
                    ErrorResponse::new(kind, "Database transaction failed")
                }
                other => {
                    // Log the actual error but return a generic message
                    error!("Database operation failed: {}", other);
                    ErrorResponse::new(kind, "Database operation failed")
                }
            },
            other => {
                error!("Configuration error: {}", other);
                ErrorResponse::new(kind, other.to_string())
            }
        }
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ErrorResponse {}
