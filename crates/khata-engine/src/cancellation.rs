//! # Invoice Cancellation (Compensator)
//!
//! Reverses a committed billing transaction with new, explicit inverse
//! writes. This is NOT a rollback: billing committed long ago, possibly
//! days ago - the compensator runs as its own later transaction.
//!
//! ## Reversal Arithmetic
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      cancel_invoice                                 │
//! │                                                                     │
//! │  BEGIN                                                              │
//! │   1. Per line: stock goes back on the shelf                         │
//! │      (best-effort: a since-deleted item is logged and skipped)      │
//! │   2. The invoice debited grand_total and credited paid_amount,      │
//! │      so the net debt it contributed is                              │
//! │        balance_to_reverse = grand_total − paid_amount               │
//! │      If positive: one credit entry for exactly that amount.         │
//! │   3. Delete the invoice (lines cascade)                             │
//! │  COMMIT                                                             │
//! │                                                                     │
//! │  With no intervening activity, stock and balance land exactly on    │
//! │  their pre-invoice values. Cancelling beneath LATER ledger          │
//! │  activity keeps the running balance self-consistent but does not    │
//! │  rewrite the intervening entries' snapshots - the ledger is         │
//! │  append-only.                                                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use khata_core::LedgerEntryType;
use khata_db::repository::{invoice, item, ledger};
use khata_db::{Database, DbError};

/// What a cancellation reversed.
#[derive(Debug, Clone)]
pub struct CancellationOutcome {
    pub invoice_number: String,
    /// How many line items had their stock restored (a deleted item drops
    /// its line from this count).
    pub lines_restored: usize,
    /// The net debt reversed on the customer's ledger, in paisa.
    pub balance_reversed_paisa: i64,
}

/// Cancels an invoice: restores stock, reverses the ledger impact, deletes
/// the document - one transaction.
pub async fn cancel_invoice(
    db: &Database,
    shop_id: &str,
    invoice_id: &str,
) -> EngineResult<CancellationOutcome> {
    let mut tx = db.pool().begin().await?;

    let doc = invoice::find_by_id(&mut tx, shop_id, invoice_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Invoice", invoice_id))?;
    let lines = invoice::lines_for_invoice(&mut tx, &doc.id).await?;

    // 1. Stock back on the shelf, line by line.
    let mut lines_restored = 0;
    for line in &lines {
        if item::restore_stock(&mut tx, &line.item_id, line.quantity).await? {
            lines_restored += 1;
        }
    }

    // 2. Reverse the net debt this invoice contributed.
    let to_reverse = doc.outstanding();
    let mut balance_reversed_paisa = 0;

    if let Some(customer_id) = doc.customer_id.as_deref() {
        if to_reverse.is_positive() {
            let posted = ledger::post(
                &mut tx,
                shop_id,
                customer_id,
                LedgerEntryType::Credit,
                to_reverse,
                &format!("Invoice {} Cancelled", doc.invoice_number),
                Some(&doc.id),
            )
            .await;

            match posted {
                Ok(_) => balance_reversed_paisa = to_reverse.paisa(),
                // The account itself may have been deleted since billing;
                // stock restoration still stands.
                Err(DbError::NotFound { .. }) => {
                    warn!(
                        customer_id = %customer_id,
                        invoice_number = %doc.invoice_number,
                        "Ledger reversal skipped: customer no longer exists"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    // 3. The document goes away; its lines cascade.
    invoice::delete_on(&mut tx, shop_id, &doc.id).await?;

    tx.commit().await?;

    info!(
        invoice_number = %doc.invoice_number,
        lines_restored,
        balance_reversed = %to_reverse,
        "Invoice cancelled and stock restored"
    );

    Ok(CancellationOutcome {
        invoice_number: doc.invoice_number,
        lines_restored,
        balance_reversed_paisa,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{self, CartLine, CreateInvoiceInput};
    use crate::resolver::CustomerSelection;
    use crate::testutil;
    use khata_core::{PaymentMode, DEFAULT_SHOP_ID};

    #[tokio::test]
    async fn test_cancellation_round_trip() {
        let db = testutil::test_db().await;
        let retailer = testutil::seed_retailer(&db, "Bilal Autos", "0301-0000001").await;
        let item_a = testutil::seed_item(&db, "Brake Pad", 450, 12).await;
        let item_b = testutil::seed_item(&db, "Brake Disc", 780, 8).await;

        let outcome = billing::create_invoice(
            &db,
            DEFAULT_SHOP_ID,
            CreateInvoiceInput {
                customer: CustomerSelection::Retailer {
                    customer_id: retailer.id.clone(),
                },
                lines: vec![
                    CartLine {
                        item_id: item_a.id.clone(),
                        quantity: 2,
                    },
                    CartLine {
                        item_id: item_b.id.clone(),
                        quantity: 1,
                    },
                ],
                discount_paisa: 0,
                paid_amount_paisa: 500,
                payment_mode: PaymentMode::Cash,
            },
        )
        .await
        .unwrap();

        // grand_total = 2×450 + 780 = 1680; net debt = 1680 − 500 = 1180.
        let cancelled = cancel_invoice(&db, DEFAULT_SHOP_ID, &outcome.invoice.id)
            .await
            .unwrap();
        assert_eq!(cancelled.lines_restored, 2);
        assert_eq!(cancelled.balance_reversed_paisa, 1180);

        // Stock and balance are exactly their pre-invoice values.
        let a = db
            .items()
            .get_by_id(DEFAULT_SHOP_ID, &item_a.id)
            .await
            .unwrap()
            .unwrap();
        let b = db
            .items()
            .get_by_id(DEFAULT_SHOP_ID, &item_b.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.stock_quantity, 12);
        assert_eq!(b.stock_quantity, 8);

        let account = db
            .customers()
            .get_by_id(DEFAULT_SHOP_ID, &retailer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.current_balance_paisa, 0);

        // The invoice is gone, but the ledger trail is not: sale debit,
        // payment credit, cancellation credit.
        assert!(db
            .invoices()
            .get_by_id(DEFAULT_SHOP_ID, &outcome.invoice.id)
            .await
            .unwrap()
            .is_none());
        let entries = db
            .ledger()
            .entries_for_customer(DEFAULT_SHOP_ID, &retailer.id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            db.ledger()
                .signed_sum(DEFAULT_SHOP_ID, &retailer.id)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_fully_paid_invoice_reverses_no_balance() {
        let db = testutil::test_db().await;
        let retailer = testutil::seed_retailer(&db, "City Motors", "0302-0000002").await;
        let item = testutil::seed_item(&db, "Oil Filter", 85, 30).await;

        let outcome = billing::create_invoice(
            &db,
            DEFAULT_SHOP_ID,
            CreateInvoiceInput {
                customer: CustomerSelection::Retailer {
                    customer_id: retailer.id.clone(),
                },
                lines: vec![CartLine {
                    item_id: item.id.clone(),
                    quantity: 2,
                }],
                discount_paisa: 0,
                paid_amount_paisa: 170,
                payment_mode: PaymentMode::Cash,
            },
        )
        .await
        .unwrap();

        let cancelled = cancel_invoice(&db, DEFAULT_SHOP_ID, &outcome.invoice.id)
            .await
            .unwrap();

        // Fully paid: no debt to reverse, stock still comes back.
        assert_eq!(cancelled.balance_reversed_paisa, 0);
        let reloaded = db
            .items()
            .get_by_id(DEFAULT_SHOP_ID, &item.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.stock_quantity, 30);

        let entries = db
            .ledger()
            .entries_for_customer(DEFAULT_SHOP_ID, &retailer.id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2); // sale debit + payment credit only
    }

    #[tokio::test]
    async fn test_cancel_unknown_invoice() {
        let db = testutil::test_db().await;

        let err = cancel_invoice(&db, DEFAULT_SHOP_ID, "no-such-invoice")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
