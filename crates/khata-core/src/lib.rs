//! # khata-core: Pure Business Logic for Khata
//!
//! This crate is the **heart** of Khata. It contains the domain model for a
//! shop's inventory, billing, B2B ordering, returns, and the running customer
//! credit ledger, as pure types and functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Khata Architecture                           │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │                khata-engine (units of work)                 │   │
//! │  │   create_invoice, dispatch_order, process_return, ...       │   │
//! │  └─────────────────────────────┬───────────────────────────────┘   │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼───────────────────────────────┐   │
//! │  │               ★ khata-core (THIS CRATE) ★                   │   │
//! │  │                                                             │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌────────────┐ │   │
//! │  │   │  types   │  │  money   │  │  error   │  │ validation │ │   │
//! │  │   │  Item    │  │  Money   │  │ CoreError│  │   rules    │ │   │
//! │  │   │  Ledger  │  │  paisa   │  │          │  │   checks   │ │   │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └────────────┘ │   │
//! │  │                                                             │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────┬───────────────────────────────┘   │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼───────────────────────────────┐   │
//! │  │                    khata-db (Database Layer)                │   │
//! │  │             SQLite queries, migrations, repositories        │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, Customer, LedgerEntry, Invoice, Order, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in paisa (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use khata_core::Money` instead of
// `use khata_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default shop ID used by the seed binary and tests.
///
/// ## Why a constant?
/// The schema is shop-scoped everywhere (multi-tenant), but development and
/// test environments run against a single shop. Real deployments carry the
/// shop id of the authenticated user instead.
pub const DEFAULT_SHOP_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum distinct lines allowed in a single billing cart
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity for a single cart or order line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Name recorded for a walk-in customer when the cashier leaves it blank.
pub const DEFAULT_WALKIN_NAME: &str = "Walk-in Customer";
