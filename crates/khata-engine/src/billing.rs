//! # Billing Engine
//!
//! Point-of-sale invoice creation: the busiest unit of work in the system.
//!
//! ## One Transaction, Four Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      create_invoice                                 │
//! │                                                                     │
//! │  BEGIN                                                              │
//! │   1. Resolve customer (walk-in get-or-create lives inside the tx)   │
//! │   2. Per cart line: deduct stock, snapshot name + unit price        │
//! │      └── any shortfall aborts the WHOLE call - no partial           │
//! │          deduction survives a failed invoice                        │
//! │   3. Insert invoice + line snapshots                                │
//! │      grand_total = Σ line totals − discount                         │
//! │   4. Ledger: debit grand_total, then credit paid_amount (if any)    │
//! │      └── posted in causal order: the debit's balance snapshot       │
//! │          excludes the payment, the credit's is the final balance    │
//! │  COMMIT                                                             │
//! │                                                                     │
//! │  Net balance effect: += grand_total − paid_amount                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::resolver::{self, CustomerSelection};
use khata_core::{
    validation, CustomerResolution, Invoice, InvoiceItem, LedgerEntry, LedgerEntryType, Money,
    PaymentMode,
};
use khata_db::repository::item::DeductOutcome;
use khata_db::repository::{invoice, item, ledger};
use khata_db::Database;

/// One cart line: which item, how many.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: String,
    pub quantity: i64,
}

/// Input to [`create_invoice`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvoiceInput {
    pub customer: CustomerSelection,
    pub lines: Vec<CartLine>,
    pub discount_paisa: i64,
    pub paid_amount_paisa: i64,
    pub payment_mode: PaymentMode,
}

/// What a successful billing call produced.
#[derive(Debug, Clone)]
pub struct BillingOutcome {
    pub invoice: Invoice,
    /// Tagged so callers can audit implicit walk-in account creation.
    pub customer: CustomerResolution,
    /// The sale debit. Absent only for a zero-total invoice.
    pub debit_entry: Option<LedgerEntry>,
    /// The payment credit, when `paid_amount > 0`.
    pub payment_entry: Option<LedgerEntry>,
}

/// Creates a point-of-sale invoice as one atomic unit of work.
///
/// Any failure - unknown item, insufficient stock, unknown retailer,
/// validation - rolls back every stock deduction and ledger post already
/// made in this call.
pub async fn create_invoice(
    db: &Database,
    shop_id: &str,
    input: CreateInvoiceInput,
) -> EngineResult<BillingOutcome> {
    validation::validate_cart_size(input.lines.len())?;
    for line in &input.lines {
        validation::validate_quantity(line.quantity)?;
    }
    validation::validate_amount_paisa(input.discount_paisa, "discount")?;
    validation::validate_amount_paisa(input.paid_amount_paisa, "paid amount")?;

    let mut tx = db.pool().begin().await?;

    // 1. Resolve the counterparty.
    let customer = resolver::resolve(&mut tx, shop_id, &input.customer).await?;

    // 2. Deduct stock and build line snapshots.
    let invoice_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let mut subtotal = Money::zero();
    let mut lines: Vec<InvoiceItem> = Vec::with_capacity(input.lines.len());

    for cart_line in &input.lines {
        let snapshot =
            match item::deduct_stock(&mut tx, shop_id, &cart_line.item_id, cart_line.quantity)
                .await?
            {
                DeductOutcome::Deducted(snapshot) => snapshot,
                DeductOutcome::Insufficient { name, available } => {
                    return Err(EngineError::InsufficientStock {
                        name,
                        available,
                        requested: cart_line.quantity,
                    });
                }
                DeductOutcome::NotFound => {
                    return Err(EngineError::not_found("Item", cart_line.item_id.as_str()));
                }
            };

        let unit_price = Money::from_paisa(snapshot.unit_price_paisa);
        let line_total = unit_price.multiply_quantity(cart_line.quantity);
        subtotal += line_total;

        lines.push(InvoiceItem {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.clone(),
            item_id: cart_line.item_id.clone(),
            item_name: snapshot.name,
            quantity: cart_line.quantity,
            unit_price_paisa: unit_price.paisa(),
            total_price_paisa: line_total.paisa(),
            created_at: now,
        });
    }

    // 3. Totals and document writes.
    let discount = Money::from_paisa(input.discount_paisa);
    if discount > subtotal {
        return Err(EngineError::validation("discount cannot exceed subtotal"));
    }
    let grand_total = subtotal - discount;
    let paid = Money::from_paisa(input.paid_amount_paisa);

    let doc = Invoice {
        id: invoice_id.clone(),
        shop_id: shop_id.to_string(),
        customer_id: Some(customer.customer_id().to_string()),
        customer_name: Some(customer.name.clone()),
        customer_phone: customer.phone.clone(),
        invoice_number: invoice::generate_invoice_number(),
        total_amount_paisa: subtotal.paisa(),
        discount_paisa: discount.paisa(),
        grand_total_paisa: grand_total.paisa(),
        paid_amount_paisa: paid.paisa(),
        payment_mode: input.payment_mode,
        created_at: now,
        updated_at: now,
    };

    invoice::insert_invoice(&mut tx, &doc).await?;
    for line in &lines {
        invoice::insert_line(&mut tx, line).await?;
    }

    // 4. Ledger posts, strictly in causal order.
    let debit_entry = if grand_total.is_positive() {
        Some(
            ledger::post(
                &mut tx,
                shop_id,
                customer.customer_id(),
                LedgerEntryType::Debit,
                grand_total,
                &format!("Invoice {} (Sale)", doc.invoice_number),
                Some(&doc.id),
            )
            .await?,
        )
    } else {
        None
    };

    let payment_entry = if paid.is_positive() {
        Some(
            ledger::post(
                &mut tx,
                shop_id,
                customer.customer_id(),
                LedgerEntryType::Credit,
                paid,
                &format!(
                    "Payment for {} ({})",
                    doc.invoice_number,
                    input.payment_mode.label()
                ),
                Some(&doc.id),
            )
            .await?,
        )
    } else {
        None
    };

    tx.commit().await?;

    info!(
        invoice_number = %doc.invoice_number,
        grand_total = %grand_total,
        paid = %paid,
        new_customer = customer.resolution.was_created(),
        "Invoice created"
    );

    Ok(BillingOutcome {
        invoice: doc,
        customer: customer.resolution,
        debit_entry,
        payment_entry,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
