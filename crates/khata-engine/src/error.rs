//! # Engine Error Types
//!
//! The caller-facing error taxonomy for accounting operations.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Engine Error Categories                         │
//! │                                                                     │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐  │
//! │  │   Client Input   │  │  Business State  │  │  Infrastructure  │  │
//! │  │                  │  │                  │  │                  │  │
//! │  │  Validation      │  │  InsufficientStock│ │  Database        │  │
//! │  │  NotFound        │  │  AlreadyProcessed│  │                  │  │
//! │  │                  │  │  IntegrityViolation│ │                 │  │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────┘  │
//! │                                                                     │
//! │  Whatever the category: the operation's transaction has been        │
//! │  rolled back in full. There are no partial effects to clean up.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use khata_core::CoreError;
use khata_db::DbError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type covering every way an accounting operation can fail.
///
/// ## Design Principles
/// - Each variant includes enough context for a human-readable message
/// - Variants map one-to-one onto caller remediation strategies:
///   fix the input, resubmit later, or report the infrastructure fault
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or missing input. Nothing was written.
    #[error("{0}")]
    Validation(String),

    /// A stock deduction failed. The whole operation rolled back - no line
    /// of the cart was applied.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// The order or return request already left the state this operation
    /// requires. Nothing was written.
    #[error("{entity} {id} is already processed (status: {status})")]
    AlreadyProcessed {
        entity: &'static str,
        id: String,
        status: String,
    },

    /// A referenced entity is missing or outside the caller's shop scope.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A deletion was blocked by existing references. Distinct from other
    /// failures so the caller can offer a remediation flow.
    #[error("Cannot delete {entity}: {reason}")]
    IntegrityViolation { entity: String, reason: String },

    /// The storage layer failed in a way the caller cannot fix.
    #[error("Database error: {0}")]
    Database(String),
}

impl EngineError {
    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }

    /// True when the caller can fix this by changing the request
    /// (as opposed to an infrastructure fault).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, EngineError::Database(_))
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ItemNotFound(id) => EngineError::not_found("Item", id),
            CoreError::CustomerNotFound(id) => EngineError::not_found("Customer", id),
            CoreError::InsufficientStock {
                name,
                available,
                requested,
            } => EngineError::InsufficientStock {
                name,
                available,
                requested,
            },
            CoreError::AlreadyProcessed { entity, id, status } => {
                EngineError::AlreadyProcessed { entity, id, status }
            }
            other => EngineError::Validation(other.to_string()),
        }
    }
}

impl From<khata_core::ValidationError> for EngineError {
    fn from(err: khata_core::ValidationError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            DbError::DeleteBlocked { entity, reason } => {
                EngineError::IntegrityViolation { entity, reason }
            }
            // A unique-constraint hit is a client-resolvable conflict: the
            // walk-in phone race resolves by resubmitting, which finds the
            // account the winning transaction created.
            DbError::UniqueViolation { field, .. } => {
                EngineError::Validation(format!("Duplicate value for {field}"))
            }
            other => EngineError::Database(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::from(DbError::from(err))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
