//! # Validation Module
//!
//! Input validation utilities for Khata.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: Transport (outside this workspace)                        │
//! │  ├── Type validation (deserialization)                              │
//! │  └── Immediate caller feedback                                      │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: THIS MODULE - business rule validation                    │
//! │  ├── Quantities positive and bounded                                │
//! │  ├── Amounts non-negative                                           │
//! │  └── Identifiers well-formed                                        │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (SQLite)                                         │
//! │  ├── NOT NULL / CHECK constraints                                   │
//! │  ├── UNIQUE constraints (phone, invoice_number)                     │
//! │  └── Foreign key constraints                                        │
//! │                                                                     │
//! │  Defense in depth: multiple layers catch different errors           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a fulfilled quantity against the requested quantity on an
/// order line.
///
/// ## Rules
/// - Must not be negative (zero means "line not fulfilled")
/// - Must not exceed what the retailer asked for
pub fn validate_fulfilled_quantity(fulfilled: i64, requested: i64) -> ValidationResult<()> {
    if fulfilled < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: "fulfilled quantity".to_string(),
        });
    }

    if fulfilled > requested {
        return Err(ValidationError::OutOfRange {
            field: "fulfilled quantity".to_string(),
            min: 0,
            max: requested,
        });
    }

    Ok(())
}

/// Validates a monetary amount that may be zero (discounts, paid amounts).
pub fn validate_amount_paisa(paisa: i64, field: &str) -> ValidationResult<()> {
    if paisa < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a monetary amount that must be strictly positive
/// (ledger payments, refunds).
pub fn validate_positive_amount_paisa(paisa: i64, field: &str) -> ValidationResult<()> {
    if paisa <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates cart size (number of distinct lines).
pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: "cart lines".to_string(),
        });
    }

    if lines > MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 1,
            max: MAX_CART_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a phone number used as the walk-in lookup key.
///
/// ## Rules
/// - Must not be empty
/// - 4 to 20 characters, digits with optional leading `+`, spaces and dashes
///
/// ## Example
/// ```rust
/// use khata_core::validation::validate_phone;
///
/// assert!(validate_phone("+92 300 1234567").is_ok());
/// assert!(validate_phone("").is_err());
/// assert!(validate_phone("call-me-maybe").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    if phone.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 20,
        });
    }

    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let valid_chars = phone
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || c == ' ' || c == '-' || (c == '+' && i == 0));

    if digits < 4 || !valid_chars {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be a phone number (digits, spaces, dashes, optional leading +)"
                .to_string(),
        });
    }

    Ok(phone.to_string())
}

/// Validates a free-text description or reason field.
pub fn validate_description(text: &str, field: &str) -> ValidationResult<String> {
    let text = text.trim();

    if text.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if text.len() > 255 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 255,
        });
    }

    Ok(text.to_string())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Rules
/// - Must be a valid UUID format
/// - 36 characters with hyphens: xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
