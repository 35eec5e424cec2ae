//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  In floating point:                                                 │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                       │
//! │                                                                     │
//! │  A running credit ledger amplifies this: every entry carries a      │
//! │  balance snapshot, so a one-paisa drift becomes a permanent         │
//! │  discrepancy between `current_balance` and the entry history.       │
//! │                                                                     │
//! │  OUR SOLUTION: Integer Paisa                                        │
//! │    Rs 10.99 is stored as 1099 paisa (i64)                           │
//! │    Addition, subtraction and quantity multiplication are exact      │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use khata_core::money::Money;
//!
//! // Create from paisa (preferred)
//! let price = Money::from_paisa(1099); // Rs 10.99
//!
//! // Arithmetic operations
//! let line_total = price.multiply_quantity(3); // Rs 32.97
//! let total = price + Money::from_paisa(500);  // Rs 15.99
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in paisa (the smallest currency unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds and debt reversal
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// EVERY monetary value in the system flows through this type: item prices,
/// invoice totals, ledger amounts, and customer balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paisa (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// let price = Money::from_paisa(1099); // Represents Rs 10.99
    /// assert_eq!(price.paisa(), 1099);
    /// ```
    #[inline]
    pub const fn from_paisa(paisa: i64) -> Self {
        Money(paisa)
    }

    /// Creates a Money value from rupees and paisa.
    ///
    /// ## Note
    /// For negative amounts, only the rupee part should be negative.
    /// `from_rupees_paisa(-5, 50)` = -Rs 5.50, not -Rs 4.50
    #[inline]
    pub const fn from_rupees_paisa(rupees: i64, paisa: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paisa)
        } else {
            Money(rupees * 100 + paisa)
        }
    }

    /// Returns the value in paisa.
    #[inline]
    pub const fn paisa(&self) -> i64 {
        self.0
    }

    /// Returns the rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paisa portion (always 0-99).
    #[inline]
    pub const fn paisa_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// let unit_price = Money::from_paisa(299); // Rs 2.99
    /// let line_total = unit_price.multiply_quantity(3);
    /// assert_eq!(line_total.paisa(), 897); // Rs 8.97
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Subtracts without going below zero.
    ///
    /// Used for amounts that are non-negative by construction, e.g. the
    /// net debt an invoice contributed (`grand_total - paid_amount`).
    #[inline]
    pub const fn saturating_sub_zero(&self, other: Money) -> Self {
        let diff = self.0 - other.0;
        if diff < 0 {
            Money(0)
        } else {
            Money(diff)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and debugging. Client-side formatting handles
/// localization for actual display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Rs {}.{:02}", sign, self.rupees().abs(), self.paisa_part())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

/// Multiplication by i64.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
