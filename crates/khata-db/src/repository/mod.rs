//! # Repository Module
//!
//! Database repository implementations for Khata.
//!
//! ## Two Kinds of API
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                Repository Pattern, Two Flavors                      │
//! │                                                                     │
//! │  Pool-level reads (repository structs)                              │
//! │    db.items().get_by_id(shop, id)                                   │
//! │    db.ledger().entries_for_customer(shop, customer)                 │
//! │    Each call borrows a pool connection, no transaction needed.      │
//! │                                                                     │
//! │  Transactional primitives (free functions taking a connection)      │
//! │    item::deduct_stock(&mut tx, ...)                                 │
//! │    ledger::post(&mut tx, ...)                                       │
//! │    invoice::insert_invoice(&mut tx, ...)                            │
//! │    These compose inside ONE transaction owned by the engine:        │
//! │    stock, ledger and document writes commit or roll back together.  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`item::ItemRepository`] - items, stock primitives, delete guard
//! - [`customer::CustomerRepository`] - accounts, walk-in creation
//! - [`ledger::LedgerRepository`] - the append-only credit ledger
//! - [`invoice::InvoiceRepository`] - invoices and line snapshots
//! - [`order::OrderRepository`] - B2B orders and lines
//! - [`returns::ReturnRepository`] - return requests
//! - [`delivery::DeliveryRepository`] - driver directory lookups

pub mod customer;
pub mod delivery;
pub mod invoice;
pub mod item;
pub mod ledger;
pub mod order;
pub mod returns;
