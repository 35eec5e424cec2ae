//! # khata-db: Database Layer for Khata
//!
//! This crate provides database access for the Khata system.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Khata Data Flow                              │
//! │                                                                     │
//! │  Engine operation (create_invoice, dispatch_order, ...)            │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │                   khata-db (THIS CRATE)                     │   │
//! │  │                                                             │   │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database   │   │ Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)  │   │ (item, ledger │   │  (embedded)  │  │   │
//! │  │   │              │   │  invoice, …)  │   │              │  │   │
//! │  │   │ SqlitePool   │◄──│ + tx-scoped   │   │ 001_init.sql │  │   │
//! │  │   │ WAL, FK on   │   │   primitives  │   │              │  │   │
//! │  │   └──────────────┘   └───────────────┘   └──────────────┘  │   │
//! │  │                                                             │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database file (or :memory: in tests)                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations and transactional primitives

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::delivery::DeliveryRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::item::ItemRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::order::OrderRepository;
pub use repository::returns::ReturnRepository;
