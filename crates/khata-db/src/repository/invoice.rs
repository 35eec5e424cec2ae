//! # Invoice Repository
//!
//! Database operations for invoices and their line items.
//!
//! ## Snapshot Pattern
//! Line items copy the item name and unit price at billing time. The billing
//! history stays intact even if the item is renamed, repriced, or deleted
//! later.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Invoice Lifecycle                               │
//! │                                                                     │
//! │  1. CREATE (inside a billing or dispatch transaction)               │
//! │     └── insert_invoice() + insert_line() per cart line              │
//! │                                                                     │
//! │  2. (OPTIONAL) CANCEL                                               │
//! │     └── delete_on() - the compensator restores stock and reverses   │
//! │         the ledger first, then deletes; lines cascade               │
//! │                                                                     │
//! │  There is no draft state: an invoice exists only as part of a       │
//! │  committed financial transaction.                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use khata_core::{Invoice, InvoiceItem};

/// Generates an invoice number in format: INV-XXXXXXXX
///
/// Eight hex characters of UUID material - unique without a counter table,
/// short enough to read over the phone.
pub fn generate_invoice_number() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("INV-{}", &id[..8])
}

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Inserts an invoice header on the caller's transaction.
pub async fn insert_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    debug!(id = %invoice.id, invoice_number = %invoice.invoice_number, "Inserting invoice");

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, shop_id, customer_id, customer_name, customer_phone,
            invoice_number, total_amount_paisa, discount_paisa,
            grand_total_paisa, paid_amount_paisa, payment_mode,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.shop_id)
    .bind(&invoice.customer_id)
    .bind(&invoice.customer_name)
    .bind(&invoice.customer_phone)
    .bind(&invoice.invoice_number)
    .bind(invoice.total_amount_paisa)
    .bind(invoice.discount_paisa)
    .bind(invoice.grand_total_paisa)
    .bind(invoice.paid_amount_paisa)
    .bind(invoice.payment_mode)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts a line item on the caller's transaction.
pub async fn insert_line(conn: &mut SqliteConnection, line: &InvoiceItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoice_items (
            id, invoice_id, item_id, item_name, quantity,
            unit_price_paisa, total_price_paisa, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&line.id)
    .bind(&line.invoice_id)
    .bind(&line.item_id)
    .bind(&line.item_name)
    .bind(line.quantity)
    .bind(line.unit_price_paisa)
    .bind(line.total_price_paisa)
    .bind(line.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets an invoice on the caller's transaction.
pub async fn find_by_id(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<Invoice>> {
    let invoice: Option<Invoice> = sqlx::query_as(
        r#"
        SELECT
            id, shop_id, customer_id, customer_name, customer_phone,
            invoice_number, total_amount_paisa, discount_paisa,
            grand_total_paisa, paid_amount_paisa, payment_mode,
            created_at, updated_at
        FROM invoices
        WHERE id = ?1 AND shop_id = ?2
        "#,
    )
    .bind(id)
    .bind(shop_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(invoice)
}

/// Gets an invoice's lines on the caller's transaction.
pub async fn lines_for_invoice(
    conn: &mut SqliteConnection,
    invoice_id: &str,
) -> DbResult<Vec<InvoiceItem>> {
    let lines: Vec<InvoiceItem> = sqlx::query_as(
        r#"
        SELECT
            id, invoice_id, item_id, item_name, quantity,
            unit_price_paisa, total_price_paisa, created_at
        FROM invoice_items
        WHERE invoice_id = ?1
        ORDER BY created_at
        "#,
    )
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

/// Deletes an invoice on the caller's transaction. Lines cascade.
pub async fn delete_on(conn: &mut SqliteConnection, shop_id: &str, id: &str) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM invoices WHERE id = ?1 AND shop_id = ?2")
        .bind(id)
        .bind(shop_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Invoice", id));
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice reads.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets an invoice by ID within a shop.
    pub async fn get_by_id(&self, shop_id: &str, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        find_by_id(&mut conn, shop_id, id).await
    }

    /// Gets all line items for an invoice.
    pub async fn items(&self, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let mut conn = self.pool.acquire().await?;
        lines_for_invoice(&mut conn, invoice_id).await
    }

    /// Lists a shop's invoices, newest first.
    pub async fn list(&self, shop_id: &str) -> DbResult<Vec<Invoice>> {
        let invoices: Vec<Invoice> = sqlx::query_as(
            r#"
            SELECT
                id, shop_id, customer_id, customer_name, customer_phone,
                invoice_number, total_amount_paisa, discount_paisa,
                grand_total_paisa, paid_amount_paisa, payment_mode,
                created_at, updated_at
            FROM invoices
            WHERE shop_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_number_format() {
        let number = generate_invoice_number();
        assert!(number.starts_with("INV-"));
        assert_eq!(number.len(), 12);
        assert!(number[4..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_invoice_numbers_unique() {
        let a = generate_invoice_number();
        let b = generate_invoice_number();
        assert_ne!(a, b);
    }
}
