//! # Return/Refund Engine
//!
//! Return request submission and the approve/reject decision.
//!
//! ## Approval Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                process_return (approve)                             │
//! │                                                                     │
//! │  BEGIN                                                              │
//! │   1. Request must still be pending                                  │
//! │   2. Refund = order-line price snapshot × returned quantity         │
//! │      (never the item's current price)                               │
//! │   3. Credit ledger entry against the retailer                       │
//! │   4. restock flag → returned quantity goes back on the shelf        │
//! │   5. Parent order → returned (coarse: no partial-return status)     │
//! │   6. Request → approved, credit note linked                         │
//! │  COMMIT                                                             │
//! │                                                                     │
//! │  Rejection is step 1 plus a status write - no financial effect.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use khata_core::{
    validation, LedgerEntry, LedgerEntryType, OrderStatus, ReturnRequest, ReturnStatus,
};
use khata_db::repository::{item, ledger, order, returns};
use khata_db::Database;

/// The reviewer's decision on a pending request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum ReturnAction {
    Approve { restock: bool },
    Reject,
}

/// What processing a return produced.
#[derive(Debug, Clone)]
pub struct ReturnOutcome {
    pub request: ReturnRequest,
    /// The credit note, present only on approval.
    pub credit_entry: Option<LedgerEntry>,
}

/// Submits a return request against one (order, item) pair.
///
/// The requested quantity must not exceed what was actually fulfilled for
/// that line - a retailer cannot return goods that were never dispatched.
pub async fn submit_return(
    db: &Database,
    shop_id: &str,
    order_id: &str,
    item_id: &str,
    quantity: i64,
    reason: &str,
) -> EngineResult<ReturnRequest> {
    validation::validate_quantity(quantity)?;
    let reason = validation::validate_description(reason, "reason")?;

    let mut tx = db.pool().begin().await?;

    let parent = order::find_by_id(&mut tx, shop_id, order_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Order", order_id))?;

    let line = order::find_line(&mut tx, &parent.id, item_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Order line", item_id))?;

    if line.fulfilled_qty < quantity {
        return Err(EngineError::validation(format!(
            "invalid return quantity: {} fulfilled, {} requested",
            line.fulfilled_qty, quantity
        )));
    }

    let now = Utc::now();
    let request = ReturnRequest {
        id: Uuid::new_v4().to_string(),
        shop_id: shop_id.to_string(),
        retailer_id: parent.retailer_id.clone(),
        order_id: parent.id.clone(),
        item_id: item_id.to_string(),
        quantity,
        reason,
        status: ReturnStatus::Pending,
        ledger_entry_id: None,
        created_at: now,
        updated_at: now,
    };
    returns::insert(&mut tx, &request).await?;

    tx.commit().await?;

    info!(request_id = %request.id, order_number = %parent.order_number, "Return request submitted");

    Ok(request)
}

/// Approves or rejects a pending return request as one atomic unit of work.
///
/// A request that already left `pending` fails with `AlreadyProcessed` and
/// changes nothing - no second credit note can ever be issued for one
/// request.
pub async fn process_return(
    db: &Database,
    shop_id: &str,
    return_id: &str,
    action: ReturnAction,
) -> EngineResult<ReturnOutcome> {
    let mut tx = db.pool().begin().await?;

    let request = returns::find_by_id(&mut tx, shop_id, return_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Return request", return_id))?;

    if request.status != ReturnStatus::Pending {
        return Err(EngineError::AlreadyProcessed {
            entity: "Return request",
            id: request.id,
            status: request.status.as_str().to_string(),
        });
    }

    let restock = match action {
        ReturnAction::Reject => {
            if !returns::mark_rejected(&mut tx, &request.id).await? {
                return Err(EngineError::AlreadyProcessed {
                    entity: "Return request",
                    id: request.id,
                    status: ReturnStatus::Rejected.as_str().to_string(),
                });
            }

            let updated = returns::find_by_id(&mut tx, shop_id, return_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Return request", return_id))?;

            tx.commit().await?;

            info!(request_id = %updated.id, "Return rejected");

            return Ok(ReturnOutcome {
                request: updated,
                credit_entry: None,
            });
        }
        ReturnAction::Approve { restock } => restock,
    };

    // 1. Refund from the order-line price snapshot.
    let line = order::find_line(&mut tx, &request.order_id, &request.item_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Order line", request.item_id.as_str()))?;

    let refund = line.unit_price().multiply_quantity(request.quantity);

    // 2. Credit the retailer. The item may have been renamed or deleted
    //    since dispatch; fall back to the id for the description.
    let item_name = item::find_by_id(&mut tx, shop_id, &request.item_id)
        .await?
        .map(|i| i.name)
        .unwrap_or_else(|| format!("item {}", request.item_id));

    let credit = ledger::post(
        &mut tx,
        shop_id,
        &request.retailer_id,
        LedgerEntryType::Credit,
        refund,
        &format!("Return Approved (Item: {})", item_name),
        Some(&request.order_id),
    )
    .await?;

    // 3. Optionally put the goods back on the shelf.
    if restock {
        item::restore_stock(&mut tx, &request.item_id, request.quantity).await?;
    }

    // 4. Coarse order status: the retailer sees the return went through.
    order::set_status(&mut tx, &request.order_id, OrderStatus::Returned).await?;

    // 5. Decide the request, linking the credit note.
    if !returns::mark_approved(&mut tx, &request.id, &credit.id).await? {
        return Err(EngineError::AlreadyProcessed {
            entity: "Return request",
            id: request.id,
            status: ReturnStatus::Approved.as_str().to_string(),
        });
    }

    let updated = returns::find_by_id(&mut tx, shop_id, return_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Return request", return_id))?;

    tx.commit().await?;

    info!(
        request_id = %updated.id,
        refund = %refund,
        restocked = restock,
        "Return approved"
    );

    Ok(ReturnOutcome {
        request: updated,
        credit_entry: Some(credit),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fulfillment::{self, DeliveryAssignment, FulfillmentLine, OrderLineInput};
    use crate::testutil;
    use khata_core::{DeliveryType, DEFAULT_SHOP_ID};

    /// Dispatches 3 units at unit price 100 and returns the ids needed by
    /// the return tests: (retailer, order, item).
    async fn seed_dispatched_order(db: &Database) -> (String, String, String) {
        let retailer = testutil::seed_retailer(db, "Bilal Autos", "0301-0000001").await;
        let item = testutil::seed_item(db, "Air Filter", 100, 50).await;

        let placed = fulfillment::place_order(
            db,
            DEFAULT_SHOP_ID,
            &retailer.id,
            vec![OrderLineInput {
                item_id: item.id.clone(),
                quantity: 5,
            }],
        )
        .await
        .unwrap();

        let staff = db
            .delivery()
            .create_staff(DEFAULT_SHOP_ID, "Imran")
            .await
            .unwrap();

        fulfillment::dispatch_order(
            db,
            DEFAULT_SHOP_ID,
            &placed.id,
            vec![FulfillmentLine {
                item_id: item.id.clone(),
                fulfilled_qty: 3,
            }],
            DeliveryAssignment {
                delivery_type: DeliveryType::Staff,
                driver_id: staff.id,
            },
        )
        .await
        .unwrap();

        (retailer.id, placed.id, item.id)
    }

    #[tokio::test]
    async fn test_approval_with_restock() {
        let db = testutil::test_db().await;
        let (retailer_id, order_id, item_id) = seed_dispatched_order(&db).await;

        let request = submit_return(&db, DEFAULT_SHOP_ID, &order_id, &item_id, 2, "Damaged")
            .await
            .unwrap();

        let balance_before = db
            .customers()
            .get_by_id(DEFAULT_SHOP_ID, &retailer_id)
            .await
            .unwrap()
            .unwrap()
            .current_balance_paisa;

        let outcome = process_return(
            &db,
            DEFAULT_SHOP_ID,
            &request.id,
            ReturnAction::Approve { restock: true },
        )
        .await
        .unwrap();

        // Refund = snapshot price 100 × 2 units.
        let credit = outcome.credit_entry.unwrap();
        assert_eq!(credit.amount_paisa, 200);
        assert_eq!(outcome.request.status, ReturnStatus::Approved);
        assert_eq!(outcome.request.ledger_entry_id.as_deref(), Some(credit.id.as_str()));

        let account = db
            .customers()
            .get_by_id(DEFAULT_SHOP_ID, &retailer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.current_balance_paisa, balance_before - 200);

        // 50 - 3 dispatched + 2 restocked.
        let item = db
            .items()
            .get_by_id(DEFAULT_SHOP_ID, &item_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.stock_quantity, 49);

        let order = db
            .orders()
            .get_by_id(DEFAULT_SHOP_ID, &order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, OrderStatus::Returned);
    }

    #[tokio::test]
    async fn test_approval_without_restock_leaves_stock() {
        let db = testutil::test_db().await;
        let (_retailer_id, order_id, item_id) = seed_dispatched_order(&db).await;

        let request = submit_return(&db, DEFAULT_SHOP_ID, &order_id, &item_id, 1, "Wrong Item")
            .await
            .unwrap();
        process_return(
            &db,
            DEFAULT_SHOP_ID,
            &request.id,
            ReturnAction::Approve { restock: false },
        )
        .await
        .unwrap();

        let item = db
            .items()
            .get_by_id(DEFAULT_SHOP_ID, &item_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.stock_quantity, 47);
    }

    #[tokio::test]
    async fn test_rejection_has_no_financial_effect() {
        let db = testutil::test_db().await;
        let (retailer_id, order_id, item_id) = seed_dispatched_order(&db).await;

        let entries_before = db
            .ledger()
            .entries_for_customer(DEFAULT_SHOP_ID, &retailer_id)
            .await
            .unwrap()
            .len();

        let request = submit_return(&db, DEFAULT_SHOP_ID, &order_id, &item_id, 1, "Damaged")
            .await
            .unwrap();
        let outcome = process_return(&db, DEFAULT_SHOP_ID, &request.id, ReturnAction::Reject)
            .await
            .unwrap();

        assert_eq!(outcome.request.status, ReturnStatus::Rejected);
        assert!(outcome.credit_entry.is_none());
        assert_eq!(
            db.ledger()
                .entries_for_customer(DEFAULT_SHOP_ID, &retailer_id)
                .await
                .unwrap()
                .len(),
            entries_before
        );
    }

    #[tokio::test]
    async fn test_processing_decided_request_changes_nothing() {
        let db = testutil::test_db().await;
        let (retailer_id, order_id, item_id) = seed_dispatched_order(&db).await;

        let request = submit_return(&db, DEFAULT_SHOP_ID, &order_id, &item_id, 2, "Damaged")
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

        let entries_after_first = db
            .ledger()
            .entries_for_customer(DEFAULT_SHOP_ID, &retailer_id)
            .await
            .unwrap()
            .len();
        let stock_after_first = db
            .items()
            .get_by_id(DEFAULT_SHOP_ID, &item_id)
            .await
            .unwrap()
            .unwrap()
            .stock_quantity;

        // A second approval - and a late rejection - both bounce.
        let err = process_return(
            &db,
            DEFAULT_SHOP_ID,
            &request.id,
            ReturnAction::Approve { restock: true },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyProcessed { .. }));

        let err = process_return(&db, DEFAULT_SHOP_ID, &request.id, ReturnAction::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyProcessed { .. }));

        assert_eq!(
            db.ledger()
                .entries_for_customer(DEFAULT_SHOP_ID, &retailer_id)
                .await
                .unwrap()
                .len(),
            entries_after_first
        );
        assert_eq!(
            db.items()
                .get_by_id(DEFAULT_SHOP_ID, &item_id)
                .await
                .unwrap()
                .unwrap()
                .stock_quantity,
            stock_after_first
        );
    }

    #[tokio::test]
    async fn test_return_quantity_capped_by_fulfilled() {
        let db = testutil::test_db().await;
        let (_retailer_id, order_id, item_id) = seed_dispatched_order(&db).await;

        // Only 3 were fulfilled; 4 cannot come back.
        let err = submit_return(&db, DEFAULT_SHOP_ID, &order_id, &item_id, 4, "Damaged")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
