//! # Order Fulfillment Engine
//!
//! B2B order placement and dispatch.
//!
//! ## Dispatch Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      dispatch_order                                 │
//! │                                                                     │
//! │  BEGIN                                                              │
//! │   1. Order must still be pending (guarded transition)               │
//! │   2. Per line: record fulfilled qty (0 ≤ fulfilled ≤ requested);    │
//! │      deduct stock for fulfilled > 0; bill at the unit price         │
//! │      snapshotted when the order was PLACED, not today's price       │
//! │   3. One invoice: payment_mode = credit, paid = 0                   │
//! │      (B2B dispatch is always booked as debt first)                  │
//! │   4. One debit ledger entry for the fulfilled total                 │
//! │   5. Order → dispatched, invoice linked, driver resolved from       │
//! │      the delivery directory                                         │
//! │  COMMIT                                                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use khata_core::{
    validation, DeliveryType, Invoice, InvoiceItem, Money, Order, OrderItem, OrderStatus,
    LedgerEntryType, PaymentMode,
};
use khata_db::repository::item::DeductOutcome;
use khata_db::repository::{customer, delivery, invoice, item, ledger, order};
use khata_db::Database;

/// One requested line when placing an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub item_id: String,
    pub quantity: i64,
}

/// One line of a dispatch decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentLine {
    pub item_id: String,
    pub fulfilled_qty: i64,
}

/// Who carries the dispatched goods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAssignment {
    pub delivery_type: DeliveryType,
    pub driver_id: String,
}

/// What a successful dispatch produced.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub order: Order,
    pub invoice: Invoice,
}

/// Places a new B2B order in `pending` state.
///
/// Unit prices are snapshotted per line now; dispatch and any later refunds
/// bill from these snapshots.
pub async fn place_order(
    db: &Database,
    shop_id: &str,
    retailer_id: &str,
    lines: Vec<OrderLineInput>,
) -> EngineResult<Order> {
    validation::validate_cart_size(lines.len())?;
    for line in &lines {
        validation::validate_quantity(line.quantity)?;
    }

    let mut tx = db.pool().begin().await?;

    let retailer = customer::find_by_id(&mut tx, shop_id, retailer_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Customer", retailer_id))?;

    let now = Utc::now();
    let new_order = Order {
        id: Uuid::new_v4().to_string(),
        shop_id: shop_id.to_string(),
        retailer_id: retailer.id.clone(),
        invoice_id: None,
        order_number: order::generate_order_number(),
        status: OrderStatus::Pending,
        delivery_type: None,
        driver_id: None,
        driver_name: None,
        vehicle_details: None,
        created_at: now,
        updated_at: now,
    };
    order::insert_order(&mut tx, &new_order).await?;

    for line in &lines {
        let db_item = item::find_by_id(&mut tx, shop_id, &line.item_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Item", line.item_id.as_str()))?;

        order::insert_line(
            &mut tx,
            &OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: new_order.id.clone(),
                item_id: db_item.id,
                requested_qty: line.quantity,
                fulfilled_qty: 0,
                unit_price_paisa: db_item.selling_price_paisa,
                created_at: now,
            },
        )
        .await?;
    }

    tx.commit().await?;

    info!(order_number = %new_order.order_number, retailer = %retailer.name, "Order placed");

    Ok(new_order)
}

/// Dispatches a pending order: partial fulfillment, stock deduction, invoice
/// generation, ledger debit, and delivery assignment - one transaction.
pub async fn dispatch_order(
    db: &Database,
    shop_id: &str,
    order_id: &str,
    lines: Vec<FulfillmentLine>,
    delivery: DeliveryAssignment,
) -> EngineResult<DispatchOutcome> {
    if lines.is_empty() {
        return Err(EngineError::validation("dispatch requires at least one line"));
    }
    if delivery.driver_id.trim().is_empty() {
        return Err(EngineError::validation("driver id is required"));
    }

    let mut tx = db.pool().begin().await?;

    // 1. The order must still be pending.
    let existing = order::find_by_id(&mut tx, shop_id, order_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Order", order_id))?;

    if existing.status != OrderStatus::Pending {
        return Err(EngineError::AlreadyProcessed {
            entity: "Order",
            id: existing.id,
            status: existing.status.as_str().to_string(),
        });
    }

    // 2. Record fulfillment, deduct stock, accumulate the billed total at
    //    the order-time price snapshots.
    let invoice_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let mut total = Money::zero();
    let mut invoice_lines: Vec<InvoiceItem> = Vec::new();

    for line in &lines {
        let order_line = order::find_line(&mut tx, &existing.id, &line.item_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Order line", line.item_id.as_str()))?;

        validation::validate_fulfilled_quantity(line.fulfilled_qty, order_line.requested_qty)?;
        order::set_fulfilled_qty(&mut tx, &order_line.id, line.fulfilled_qty).await?;

        if line.fulfilled_qty == 0 {
            continue;
        }

        let snapshot =
            match item::deduct_stock(&mut tx, shop_id, &line.item_id, line.fulfilled_qty).await? {
                DeductOutcome::Deducted(snapshot) => snapshot,
                DeductOutcome::Insufficient { name, available } => {
                    return Err(EngineError::InsufficientStock {
                        name,
                        available,
                        requested: line.fulfilled_qty,
                    });
                }
                DeductOutcome::NotFound => {
                    return Err(EngineError::not_found("Item", line.item_id.as_str()));
                }
            };

        let unit_price = order_line.unit_price();
        let line_total = unit_price.multiply_quantity(line.fulfilled_qty);
        total += line_total;

        invoice_lines.push(InvoiceItem {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.clone(),
            item_id: line.item_id.clone(),
            item_name: snapshot.name,
            quantity: line.fulfilled_qty,
            unit_price_paisa: unit_price.paisa(),
            total_price_paisa: line_total.paisa(),
            created_at: now,
        });
    }

    // An all-zero dispatch would book a zero-amount invoice and ledger
    // entry; reject it before any document exists.
    if total.is_zero() {
        return Err(EngineError::validation(
            "dispatch requires at least one fulfilled quantity",
        ));
    }

    // 3. One invoice, booked entirely as debt.
    let retailer = customer::find_by_id(&mut tx, shop_id, &existing.retailer_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Customer", existing.retailer_id.as_str()))?;

    let doc = Invoice {
        id: invoice_id.clone(),
        shop_id: shop_id.to_string(),
        customer_id: Some(retailer.id.clone()),
        customer_name: Some(retailer.name.clone()),
        customer_phone: retailer.phone.clone(),
        invoice_number: invoice::generate_invoice_number(),
        total_amount_paisa: total.paisa(),
        discount_paisa: 0,
        grand_total_paisa: total.paisa(),
        paid_amount_paisa: 0,
        payment_mode: PaymentMode::Credit,
        created_at: now,
        updated_at: now,
    };
    invoice::insert_invoice(&mut tx, &doc).await?;
    for line in &invoice_lines {
        invoice::insert_line(&mut tx, line).await?;
    }

    // 4. Debit the retailer for the fulfilled total.
    ledger::post(
        &mut tx,
        shop_id,
        &retailer.id,
        LedgerEntryType::Debit,
        total,
        &format!("Order {} (Invoice generated)", existing.order_number),
        Some(&doc.id),
    )
    .await?;

    // 5. Delivery assignment and the status transition.
    let driver = delivery::resolve_driver(
        &mut tx,
        shop_id,
        delivery.delivery_type,
        &delivery.driver_id,
    )
    .await?
    .unwrap_or_else(|| khata_core::DriverInfo {
        name: "Unknown".to_string(),
        vehicle_details: None,
    });

    let transitioned = order::mark_dispatched(
        &mut tx,
        shop_id,
        &existing.id,
        &doc.id,
        delivery.delivery_type,
        &delivery.driver_id,
        &driver.name,
        driver.vehicle_details.as_deref(),
    )
    .await?;

    if !transitioned {
        // Lost a race with a concurrent dispatch after the initial read.
        return Err(EngineError::AlreadyProcessed {
            entity: "Order",
            id: existing.id,
            status: OrderStatus::Dispatched.as_str().to_string(),
        });
    }

    let updated = order::find_by_id(&mut tx, shop_id, &existing.id)
        .await?
        .ok_or_else(|| EngineError::not_found("Order", order_id))?;

    tx.commit().await?;

    info!(
        order_number = %updated.order_number,
        invoice_number = %doc.invoice_number,
        total = %total,
        driver = %driver.name,
        "Order dispatched and billed"
    );

    Ok(DispatchOutcome {
        order: updated,
        invoice: doc,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use khata_core::DEFAULT_SHOP_ID;

    async fn seed_dispatchable_order(
        db: &Database,
    ) -> (String, String, String, String) {
        let retailer = testutil::seed_retailer(db, "Bilal Autos", "0301-0000001").await;
        let item_a = testutil::seed_item(db, "Oil Filter", 50, 100).await;
        let item_b = testutil::seed_item(db, "Air Filter", 100, 100).await;

        let placed = place_order(
            db,
            DEFAULT_SHOP_ID,
            &retailer.id,
            vec![
                OrderLineInput {
                    item_id: item_a.id.clone(),
                    quantity: 10,
                },
                OrderLineInput {
                    item_id: item_b.id.clone(),
                    quantity: 5,
                },
            ],
        )
        .await
        .unwrap();

        (retailer.id, placed.id, item_a.id, item_b.id)
    }

    async fn staff_delivery(db: &Database) -> DeliveryAssignment {
        let staff = db
            .delivery()
            .create_staff(DEFAULT_SHOP_ID, "Imran")
            .await
            .unwrap();
        DeliveryAssignment {
            delivery_type: DeliveryType::Staff,
            driver_id: staff.id,
        }
    }

    #[tokio::test]
    async fn test_partial_dispatch_bills_at_order_snapshots() {
        let db = testutil::test_db().await;
        let (retailer_id, order_id, item_a, item_b) = seed_dispatchable_order(&db).await;
        let delivery = staff_delivery(&db).await;

        let outcome = dispatch_order(
            &db,
            DEFAULT_SHOP_ID,
            &order_id,
            vec![
                FulfillmentLine {
                    item_id: item_a.clone(),
                    fulfilled_qty: 10,
                },
                FulfillmentLine {
                    item_id: item_b.clone(),
                    fulfilled_qty: 3,
                },
            ],
            delivery,
        )
        .await
        .unwrap();

        // 10 × 50 + 3 × 100
        assert_eq!(outcome.invoice.grand_total_paisa, 800);
        assert_eq!(outcome.invoice.paid_amount_paisa, 0);
        assert_eq!(outcome.invoice.payment_mode, PaymentMode::Credit);
        assert_eq!(outcome.order.status, OrderStatus::Dispatched);
        assert_eq!(outcome.order.invoice_id.as_deref(), Some(outcome.invoice.id.as_str()));
        assert_eq!(outcome.order.driver_name.as_deref(), Some("Imran (Staff)"));

        // Exactly one debit entry for the fulfilled total.
        let entries = db
            .ledger()
            .entries_for_customer(DEFAULT_SHOP_ID, &retailer_id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount_paisa, 800);
        assert_eq!(entries[0].balance_after_paisa, 800);

        // Stock moved only for what was fulfilled.
        let a = db
            .items()
            .get_by_id(DEFAULT_SHOP_ID, &item_a)
            .await
            .unwrap()
            .unwrap();
        let b = db
            .items()
            .get_by_id(DEFAULT_SHOP_ID, &item_b)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.stock_quantity, 90);
        assert_eq!(b.stock_quantity, 97);

        // Fulfilled quantities recorded on the order lines.
        let lines = db.orders().items(&order_id).await.unwrap();
        let fulfilled_for = |item: &str| {
            lines
                .iter()
                .find(|l| l.item_id == item)
                .map(|l| l.fulfilled_qty)
                .unwrap()
        };
        assert_eq!(fulfilled_for(&item_a), 10);
        assert_eq!(fulfilled_for(&item_b), 3);
    }

    #[tokio::test]
    async fn test_dispatch_twice_is_already_processed() {
        let db = testutil::test_db().await;
        let (_retailer_id, order_id, item_a, _item_b) = seed_dispatchable_order(&db).await;
        let delivery = staff_delivery(&db).await;

        dispatch_order(
            &db,
            DEFAULT_SHOP_ID,
            &order_id,
            vec![FulfillmentLine {
                item_id: item_a.clone(),
                fulfilled_qty: 1,
            }],
            delivery.clone(),
        )
        .await
        .unwrap();

        let err = dispatch_order(
            &db,
            DEFAULT_SHOP_ID,
            &order_id,
            vec![FulfillmentLine {
                item_id: item_a,
                fulfilled_qty: 1,
            }],
            delivery,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::AlreadyProcessed { .. }));
    }

    #[tokio::test]
    async fn test_zero_total_dispatch_rejected() {
        let db = testutil::test_db().await;
        let (_retailer_id, order_id, item_a, item_b) = seed_dispatchable_order(&db).await;
        let delivery = staff_delivery(&db).await;

        let err = dispatch_order(
            &db,
            DEFAULT_SHOP_ID,
            &order_id,
            vec![
                FulfillmentLine {
                    item_id: item_a,
                    fulfilled_qty: 0,
                },
                FulfillmentLine {
                    item_id: item_b,
                    fulfilled_qty: 0,
                },
            ],
            delivery,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));

        // The rejection rolled back everything, including the fulfilled-qty
        // writes, and the order is still dispatchable.
        let reloaded = db
            .orders()
            .get_by_id(DEFAULT_SHOP_ID, &order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.status, OrderStatus::Pending);
        assert!(db.invoices().list(DEFAULT_SHOP_ID).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fulfilled_cannot_exceed_requested() {
        let db = testutil::test_db().await;
        let (_retailer_id, order_id, item_a, _item_b) = seed_dispatchable_order(&db).await;
        let delivery = staff_delivery(&db).await;

        let err = dispatch_order(
            &db,
            DEFAULT_SHOP_ID,
            &order_id,
            vec![FulfillmentLine {
                item_id: item_a,
                fulfilled_qty: 11,
            }],
            delivery,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_place_order_snapshots_prices() {
        let db = testutil::test_db().await;
        let retailer = testutil::seed_retailer(&db, "City Motors", "0302-0000002").await;
        let item = testutil::seed_item(&db, "Clutch Plate", 1_250, 20).await;

        let placed = place_order(
            &db,
            DEFAULT_SHOP_ID,
            &retailer.id,
            vec![OrderLineInput {
                item_id: item.id.clone(),
                quantity: 4,
            }],
        )
        .await
        .unwrap();

        assert_eq!(placed.status, OrderStatus::Pending);

        let lines = db.orders().items(&placed.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].requested_qty, 4);
        assert_eq!(lines[0].fulfilled_qty, 0);
        assert_eq!(lines[0].unit_price_paisa, 1_250);
    }
}
