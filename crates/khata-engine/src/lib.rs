//! # khata-engine: The Transactional Accounting Engine
//!
//! Every financial operation in Khata goes through this crate, and every one
//! of them is a single SQLite transaction: stock movements, document writes
//! and ledger posts commit together or not at all.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     khata-engine Operations                         │
//! │                                                                     │
//! │  billing::create_invoice      POS sale: resolve customer, deduct    │
//! │                               stock, invoice, debit + payment credit│
//! │                                                                     │
//! │  fulfillment::place_order     B2B order with price snapshots        │
//! │  fulfillment::dispatch_order  partial fulfillment, invoice, debit,  │
//! │                               delivery assignment                   │
//! │                                                                     │
//! │  returns::submit_return       request against one (order, item)     │
//! │  returns::process_return      approve (credit + optional restock)   │
//! │                               or reject                             │
//! │                                                                     │
//! │  cancellation::cancel_invoice compensator: restore stock, reverse   │
//! │                               net debt, delete document             │
//! │                                                                     │
//! │  payments::record_payment     standalone ledger credit              │
//! │                                                                     │
//! │  Shared primitives underneath (khata-db): guarded stock UPDATEs     │
//! │  and the balance-snapshot ledger post.                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Invariants This Crate Defends
//!
//! 1. `customers.current_balance` equals the signed sum of that customer's
//!    ledger entries, at all times.
//! 2. `items.stock_quantity` never goes negative; a deduction that would
//!    violate this rejects the whole operation.
//! 3. No partial effects: any error rolls back everything the operation
//!    wrote.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod cancellation;
pub mod error;
pub mod fulfillment;
pub mod payments;
pub mod resolver;
pub mod returns;

// =============================================================================
// Re-exports
// =============================================================================

pub use billing::{create_invoice, BillingOutcome, CartLine, CreateInvoiceInput};
pub use cancellation::{cancel_invoice, CancellationOutcome};
pub use error::{EngineError, EngineResult};
pub use fulfillment::{
    dispatch_order, place_order, DeliveryAssignment, DispatchOutcome, FulfillmentLine,
    OrderLineInput,
};
pub use payments::record_payment;
pub use resolver::{CustomerSelection, ResolvedCustomer};
pub use returns::{process_return, submit_return, ReturnAction, ReturnOutcome};

// =============================================================================
// Test Utilities
// =============================================================================

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::Utc;
    use uuid::Uuid;

    use khata_core::{Customer, Item, LedgerEntryType, Money, DEFAULT_SHOP_ID};
    use khata_db::repository::ledger;
    use khata_db::{Database, DbConfig};

    /// Fresh in-memory database with migrations applied.
    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Inserts an item with the given selling price (paisa) and stock.
    pub async fn seed_item(db: &Database, name: &str, price_paisa: i64, stock: i64) -> Item {
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4().to_string(),
            shop_id: DEFAULT_SHOP_ID.to_string(),
            category_id: None,
            subcategory_id: None,
            location_id: None,
            name: name.to_string(),
            part_number: None,
            purchase_price_paisa: price_paisa / 2,
            selling_price_paisa: price_paisa,
            stock_quantity: stock,
            created_at: now,
            updated_at: now,
        };
        db.items().insert(&item).await.unwrap();
        item
    }

    /// Creates a B2B retailer account.
    pub async fn seed_retailer(db: &Database, name: &str, phone: &str) -> Customer {
        db.customers()
            .create_retailer(DEFAULT_SHOP_ID, name, Some(phone), "changeme", 1_000_000)
            .await
            .unwrap()
    }

    /// Posts an opening debit so a test can start from prior debt.
    pub async fn post_opening_debit(db: &Database, customer_id: &str, amount_paisa: i64) {
        let mut tx = db.pool().begin().await.unwrap();
        ledger::post(
            &mut tx,
            DEFAULT_SHOP_ID,
            customer_id,
            LedgerEntryType::Debit,
            Money::from_paisa(amount_paisa),
            "Opening balance",
            None,
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
    }
}

// =============================================================================
// Cross-Operation Invariant Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use khata_core::{DeliveryType, PaymentMode, DEFAULT_SHOP_ID};

    /// Runs a mixed day of trading against one retailer and checks the
    /// central invariant afterwards: the running balance equals the signed
    /// sum of the ledger, and stock stayed non-negative throughout.
    #[tokio::test]
    async fn test_balance_invariant_across_mixed_operations() {
        let db = testutil::test_db().await;
        let retailer = testutil::seed_retailer(&db, "Bilal Autos", "0301-0000001").await;
        let item = testutil::seed_item(&db, "Brake Pad", 450, 30).await;

        // POS sale, partly paid.
        let sale = create_invoice(
            &db,
            DEFAULT_SHOP_ID,
            CreateInvoiceInput {
                customer: CustomerSelection::Retailer {
                    customer_id: retailer.id.clone(),
                },
                lines: vec![CartLine {
                    item_id: item.id.clone(),
                    quantity: 4,
                }],
                discount_paisa: 100,
                paid_amount_paisa: 700,
                payment_mode: PaymentMode::Mixed,
            },
        )
        .await
        .unwrap();

        // B2B order dispatched on credit.
        let placed = place_order(
            &db,
            DEFAULT_SHOP_ID,
            &retailer.id,
            vec![OrderLineInput {
                item_id: item.id.clone(),
                quantity: 6,
            }],
        )
        .await
        .unwrap();
        let staff = db
            .delivery()
            .create_staff(DEFAULT_SHOP_ID, "Imran")
            .await
            .unwrap();
        dispatch_order(
            &db,
            DEFAULT_SHOP_ID,
            &placed.id,
            vec![FulfillmentLine {
                item_id: item.id.clone(),
                fulfilled_qty: 5,
            }],
            DeliveryAssignment {
                delivery_type: DeliveryType::Staff,
                driver_id: staff.id,
            },
        )
        .await
        .unwrap();

        // A return against the dispatch, restocked.
        let request = submit_return(&db, DEFAULT_SHOP_ID, &placed.id, &item.id, 2, "Damaged")
            .await
            .unwrap();
        process_return(
            &db,
            DEFAULT_SHOP_ID,
            &request.id,
            ReturnAction::Approve { restock: true },
        )
        .await
        .unwrap();

        // A counter payment, then the POS sale is cancelled.
        record_payment(&db, DEFAULT_SHOP_ID, &retailer.id, 500, None)
            .await
            .unwrap();
        cancel_invoice(&db, DEFAULT_SHOP_ID, &sale.invoice.id)
            .await
            .unwrap();

        let account = db
            .customers()
            .get_by_id(DEFAULT_SHOP_ID, &retailer.id)
            .await
            .unwrap()
            .unwrap();
        let signed = db
            .ledger()
            .signed_sum(DEFAULT_SHOP_ID, &retailer.id)
            .await
            .unwrap();
        assert_eq!(account.current_balance_paisa, signed);

        // Every entry's snapshot equals the running balance replayed from
        // oldest to newest.
        let mut entries = db
            .ledger()
            .entries_for_customer(DEFAULT_SHOP_ID, &retailer.id)
            .await
            .unwrap();
        entries.reverse();
        let mut running = 0;
        for entry in &entries {
            running += entry.signed_amount_paisa();
            assert_eq!(entry.balance_after_paisa, running);
        }

        // Stock: 30 − 4 (sale) − 5 (dispatch) + 2 (return) + 4 (cancel).
        let reloaded = db
            .items()
            .get_by_id(DEFAULT_SHOP_ID, &item.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.stock_quantity, 27);
    }
}
