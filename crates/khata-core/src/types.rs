//! # Domain Types
//!
//! Core domain types used throughout Khata.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐      │
//! │  │     Item       │   │   Customer     │   │  LedgerEntry   │      │
//! │  │  ────────────  │   │  ────────────  │   │  ────────────  │      │
//! │  │  id (UUID)     │   │  id (UUID)     │   │  id (UUID)     │      │
//! │  │  stock_quantity│   │  current_bal.  │   │  type, amount  │      │
//! │  │  selling_price │   │  credit_limit  │   │  balance_after │      │
//! │  └────────────────┘   └────────────────┘   └────────────────┘      │
//! │                                                                     │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐      │
//! │  │    Invoice     │   │     Order      │   │ ReturnRequest  │      │
//! │  │  + InvoiceItem │   │  + OrderItem   │   │                │      │
//! │  │  snapshots     │   │  requested vs  │   │  pending →     │      │
//! │  │  totals, paid  │   │  fulfilled qty │   │  approved/rej. │      │
//! │  └────────────────┘   └────────────────┘   └────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where humans need one: (invoice_number, order_number)
//!
//! ## Snapshot Pattern
//! Invoice and order lines carry the item name and unit price frozen at the
//! moment of the transaction. Totals are never re-derived from the live item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Item
// =============================================================================

/// A shop-scoped stock keeping unit.
///
/// `stock_quantity` never goes negative; it is mutated exclusively through
/// the stock primitives in the storage layer, which check-and-decrement in a
/// single statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Shop this item belongs to.
    pub shop_id: String,

    /// Category (optional - catalog maintenance lives outside this crate).
    pub category_id: Option<String>,

    /// Subcategory (optional).
    pub subcategory_id: Option<String>,

    /// Physical storage location (optional).
    pub location_id: Option<String>,

    /// Display name shown on bills and order sheets.
    pub name: String,

    /// Manufacturer part number.
    pub part_number: Option<String>,

    /// Purchase price in paisa (what the shop paid).
    pub purchase_price_paisa: i64,

    /// Selling price in paisa (what the customer is charged).
    pub selling_price_paisa: i64,

    /// Current stock level. Never negative.
    pub stock_quantity: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Returns the selling price as a Money type.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_paisa(self.selling_price_paisa)
    }

    /// Returns the purchase price as a Money type.
    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_paisa(self.purchase_price_paisa)
    }

    /// Checks whether `quantity` units could be deducted right now.
    ///
    /// Advisory only - the authoritative check happens atomically inside the
    /// deduction statement.
    #[inline]
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

// =============================================================================
// Customer
// =============================================================================

/// Classification of a customer account.
///
/// A classification flag, not a structural distinction: both kinds accrue
/// debt through the same ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    /// Pre-onboarded B2B retailer.
    B2b,
    /// Created ad hoc during a sale, identified by phone.
    Walkin,
}

/// A party that can accrue debt against the shop.
///
/// ## The Central Invariant
/// `current_balance_paisa` equals the sum of all signed ledger entries for
/// this customer: debits increase it, credits decrease it. Positive balance
/// means the customer owes the shop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    /// Phone number - unique, and the lookup key for walk-in resolution.
    pub phone: Option<String>,
    /// Argon2 hash of the account password. Auth itself lives elsewhere;
    /// walk-in accounts get a generated default.
    pub password_hash: String,
    pub customer_type: CustomerType,
    /// Credit ceiling in paisa. Informational for B2B; zero for walk-ins.
    pub credit_limit_paisa: i64,
    /// Running balance in paisa. Positive = customer owes the shop.
    pub current_balance_paisa: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Returns the running balance as Money.
    #[inline]
    pub fn current_balance(&self) -> Money {
        Money::from_paisa(self.current_balance_paisa)
    }

    /// Returns the credit limit as Money.
    #[inline]
    pub fn credit_limit(&self) -> Money {
        Money::from_paisa(self.credit_limit_paisa)
    }
}

/// Outcome of resolving a sale's counterparty to a customer account.
///
/// Tagged so callers can distinguish (and audit) implicit account creation
/// from reuse of an existing account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "customer_id")]
pub enum CustomerResolution {
    /// An account with this identity already existed.
    Existing(String),
    /// A new walk-in account was created during this operation.
    Created(String),
}

impl CustomerResolution {
    /// The resolved customer id, regardless of how it was obtained.
    pub fn customer_id(&self) -> &str {
        match self {
            CustomerResolution::Existing(id) | CustomerResolution::Created(id) => id,
        }
    }

    /// True when the resolution created a new account.
    pub fn was_created(&self) -> bool {
        matches!(self, CustomerResolution::Created(_))
    }
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryType {
    /// Customer bought on account - debt goes up.
    Debit,
    /// Money came in (or debt was reversed) - debt goes down.
    Credit,
}

/// An immutable, append-only record against a customer's account.
///
/// Entries are never updated or deleted. Corrections are additional
/// offsetting entries. `balance_after_paisa` is the customer's running
/// balance immediately after this entry was applied, captured at insert
/// time inside the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LedgerEntry {
    pub id: String,
    pub shop_id: String,
    pub customer_id: String,
    pub entry_type: LedgerEntryType,
    /// Always positive; the direction lives in `entry_type`.
    pub amount_paisa: i64,
    /// Human-readable context, e.g. "Invoice INV-1A2B3C4D (Sale)".
    pub description: String,
    /// Optional link to the document that produced this entry (invoice id).
    pub reference_id: Option<String>,
    /// Running balance snapshot immediately after this entry.
    pub balance_after_paisa: i64,
    pub entry_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Returns the entry amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paisa(self.amount_paisa)
    }

    /// Returns the post-entry balance snapshot as Money.
    #[inline]
    pub fn balance_after(&self) -> Money {
        Money::from_paisa(self.balance_after_paisa)
    }

    /// The signed effect of this entry on the running balance, in paisa.
    #[inline]
    pub fn signed_amount_paisa(&self) -> i64 {
        match self.entry_type {
            LedgerEntryType::Debit => self.amount_paisa,
            LedgerEntryType::Credit => -self.amount_paisa,
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// How an invoice was settled at the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Cash,
    Online,
    /// Fully on account - the default for B2B dispatch.
    Credit,
    Mixed,
}

impl PaymentMode {
    /// Capitalized label for ledger descriptions ("Payment for INV-x (Cash)").
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "Cash",
            PaymentMode::Online => "Online",
            PaymentMode::Credit => "Credit",
            PaymentMode::Mixed => "Mixed",
        }
    }
}

/// A billing document.
///
/// `customer_id` is nullable in the schema for historical rows; invoices
/// created through the billing engine always have a resolved customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    pub shop_id: String,
    pub customer_id: Option<String>,
    /// Name as entered at the counter (walk-ins may not have an account name).
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    /// Unique, human-facing number, e.g. "INV-1A2B3C4D".
    pub invoice_number: String,
    /// Sum of line totals, before discount.
    pub total_amount_paisa: i64,
    pub discount_paisa: i64,
    /// `total_amount - discount`.
    pub grand_total_paisa: i64,
    pub paid_amount_paisa: i64,
    pub payment_mode: PaymentMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_paisa(self.grand_total_paisa)
    }

    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_paisa(self.paid_amount_paisa)
    }

    /// The net debt this invoice contributed to the customer's balance.
    ///
    /// Never negative: an overpaid invoice contributes zero debt.
    #[inline]
    pub fn outstanding(&self) -> Money {
        self.grand_total().saturating_sub_zero(self.paid_amount())
    }
}

/// A line on an invoice. Name and unit price are frozen at billing time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub item_id: String,
    /// Item name at time of billing (frozen).
    pub item_name: String,
    pub quantity: i64,
    /// Unit price in paisa at time of billing (frozen).
    pub unit_price_paisa: i64,
    /// quantity × unit_price.
    pub total_price_paisa: i64,
    pub created_at: DateTime<Utc>,
}

impl InvoiceItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_paisa(self.unit_price_paisa)
    }

    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_paisa(self.total_price_paisa)
    }
}

// =============================================================================
// Order
// =============================================================================

/// The status of a B2B order.
///
/// ```text
/// pending ──► processing ──► dispatched ──► delivered
///    │                           │
///    └──► cancelled              └──► returned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Dispatched,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    /// Lowercase wire/database form, also used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Dispatched => "dispatched",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

/// Who carries a dispatched order to the retailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
    /// Shop's own staff member.
    Staff,
    /// Third-party delivery partner.
    Partner,
    /// Retailer picks up at the shop.
    Pickup,
}

/// A B2B order header.
///
/// On dispatch the order gains exactly one invoice and the retailer's ledger
/// gains exactly one debit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub shop_id: String,
    /// The customer who placed the order.
    pub retailer_id: String,
    /// Filled when the order is dispatched and billed.
    pub invoice_id: Option<String>,
    /// Unique, human-facing number, e.g. "ORD-1A2B3C".
    pub order_number: String,
    pub status: OrderStatus,
    pub delivery_type: Option<DeliveryType>,
    pub driver_id: Option<String>,
    /// Cached display name for quick view.
    pub driver_name: Option<String>,
    pub vehicle_details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line on an order: requested vs fulfilled quantity, with the unit price
/// snapshotted when the order was placed. Dispatch and refunds always use
/// this snapshot, never the item's current price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub item_id: String,
    pub requested_qty: i64,
    /// Set at dispatch; zero until then.
    pub fulfilled_qty: i64,
    /// Unit price in paisa at order placement (frozen).
    pub unit_price_paisa: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_paisa(self.unit_price_paisa)
    }
}

// =============================================================================
// Return Request
// =============================================================================

/// The status of a return request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReturnStatus {
    /// Lowercase wire/database form, also used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::Pending => "pending",
            ReturnStatus::Approved => "approved",
            ReturnStatus::Rejected => "rejected",
        }
    }
}

/// One request to return quantity against one (order, item) pair.
///
/// Approval produces exactly one credit ledger entry (linked via
/// `ledger_entry_id`) and optionally restocks the item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReturnRequest {
    pub id: String,
    pub shop_id: String,
    pub retailer_id: String,
    pub order_id: String,
    pub item_id: String,
    pub quantity: i64,
    /// "Damaged", "Wrong Item", ...
    pub reason: String,
    pub status: ReturnStatus,
    /// The credit note, once approved.
    pub ledger_entry_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Delivery Directory
// =============================================================================

/// A third-party delivery partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DeliveryPartner {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub vehicle_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A shop staff member who can be assigned deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StaffMember {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A resolved driver assignment: display name plus vehicle string.
///
/// The directory lookup is opaque to the fulfillment engine; it only needs
/// something printable for the order sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub name: String,
    pub vehicle_details: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_accessors() {
        let existing = CustomerResolution::Existing("abc".into());
        assert_eq!(existing.customer_id(), "abc");
        assert!(!existing.was_created());

        let created = CustomerResolution::Created("def".into());
        assert_eq!(created.customer_id(), "def");
        assert!(created.was_created());
    }

    #[test]
    fn test_ledger_signed_amount() {
        let mut entry = LedgerEntry {
            id: "e1".into(),
            shop_id: "s1".into(),
            customer_id: "c1".into(),
            entry_type: LedgerEntryType::Debit,
            amount_paisa: 500,
            description: "test".into(),
            reference_id: None,
            balance_after_paisa: 500,
            entry_date: Utc::now(),
            created_at: Utc::now(),
        };
        assert_eq!(entry.signed_amount_paisa(), 500);

        entry.entry_type = LedgerEntryType::Credit;
        assert_eq!(entry.signed_amount_paisa(), -500);
    }

    #[test]
    fn test_invoice_outstanding() {
        let invoice = Invoice {
            id: "i1".into(),
            shop_id: "s1".into(),
            customer_id: Some("c1".into()),
            customer_name: None,
            customer_phone: None,
            invoice_number: "INV-TEST0001".into(),
            total_amount_paisa: 600,
            discount_paisa: 100,
            grand_total_paisa: 500,
            paid_amount_paisa: 200,
            payment_mode: PaymentMode::Cash,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(invoice.outstanding().paisa(), 300);
    }

    #[test]
    fn test_payment_mode_label() {
        assert_eq!(PaymentMode::Cash.label(), "Cash");
        assert_eq!(PaymentMode::Credit.label(), "Credit");
    }

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }
}
