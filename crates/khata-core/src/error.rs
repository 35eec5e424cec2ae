//! # Error Types
//!
//! Domain-specific error types for khata-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  khata-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  khata-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                 │
//! │                                                                     │
//! │  khata-engine errors (separate crate)                               │
//! │  └── EngineError      - What API callers see                        │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → EngineError → caller           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item name, ID, quantities)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. Every one of them aborts
/// the enclosing unit of work with no side effects left behind.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Item cannot be found (or is outside the caller's shop scope).
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Customer account cannot be found (or is outside the caller's shop scope).
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Insufficient stock to complete a deduction.
    ///
    /// ## When This Occurs
    /// - A billing cart or dispatch line asks for more than is on the shelf
    ///
    /// The item is identified by name because that is what the cashier sees
    /// on the error toast.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// The order or return request already left the state the operation
    /// requires (e.g. dispatching a non-pending order).
    #[error("{entity} {id} is already processed (status: {status})")]
    AlreadyProcessed {
        entity: &'static str,
        id: String,
        status: String,
    },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// An amount is invalid for the operation (e.g. zero-total dispatch).
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid phone).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., two cart lines for one item).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            name: "Brake Pad".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Brake Pad: available 3, requested 5"
        );
    }

    #[test]
    fn test_already_processed_message() {
        let err = CoreError::AlreadyProcessed {
            entity: "Order",
            id: "ord-1".to_string(),
            status: "dispatched".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Order ord-1 is already processed (status: dispatched)"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "phone".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
