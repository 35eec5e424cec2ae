//! # Item Repository (Stock Ledger)
//!
//! Database operations for items and their stock quantities.
//!
//! ## Stock Mutation Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Mutation Rules                             │
//! │                                                                     │
//! │  stock_quantity is mutated ONLY through the primitives here:       │
//! │                                                                     │
//! │  deduct_stock(conn, ...)                                            │
//! │    └── single guarded UPDATE:                                       │
//! │        SET stock_quantity = stock_quantity - qty                    │
//! │        WHERE ... AND stock_quantity >= qty                          │
//! │        Check and decrement are ONE statement - two concurrent       │
//! │        sales can never both observe sufficient stock and both       │
//! │        succeed past the shelf.                                      │
//! │                                                                     │
//! │  restore_stock(conn, ...)                                           │
//! │    └── plain increment; missing item is logged and skipped          │
//! │        (the item may have been deleted since it was billed)         │
//! │                                                                     │
//! │  Both take `&mut SqliteConnection` so they compose inside the      │
//! │  caller's transaction: stock never moves outside a unit of work.   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use khata_core::Item;

// =============================================================================
// Stock Primitives
// =============================================================================

/// Name and unit price captured at the moment of deduction.
///
/// The invoice line is built from this snapshot, never from a later re-read
/// of the item, so the bill reflects the price actually charged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSnapshot {
    pub name: String,
    pub unit_price_paisa: i64,
}

/// Outcome of a stock deduction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeductOutcome {
    /// Stock was decremented; snapshot taken in the same transaction.
    Deducted(PriceSnapshot),
    /// Not enough on the shelf. Nothing was written.
    Insufficient { name: String, available: i64 },
    /// No such item in this shop. Nothing was written.
    NotFound,
}

/// Atomically deducts `quantity` units from an item's stock.
///
/// The decrement and the sufficiency check are a single statement, so a
/// concurrent deduction on another connection can never interleave between
/// check and write. The `available` count in the `Insufficient` outcome is
/// for the error message only.
pub async fn deduct_stock(
    conn: &mut SqliteConnection,
    shop_id: &str,
    item_id: &str,
    quantity: i64,
) -> DbResult<DeductOutcome> {
    let row: Option<(String, i64, i64)> = sqlx::query_as(
        r#"
        SELECT name, selling_price_paisa, stock_quantity
        FROM items
        WHERE id = ?1 AND shop_id = ?2
        "#,
    )
    .bind(item_id)
    .bind(shop_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some((name, unit_price_paisa, available)) = row else {
        return Ok(DeductOutcome::NotFound);
    };

    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE items
        SET stock_quantity = stock_quantity - ?3, updated_at = ?4
        WHERE id = ?1 AND shop_id = ?2 AND stock_quantity >= ?3
        "#,
    )
    .bind(item_id)
    .bind(shop_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(DeductOutcome::Insufficient { name, available });
    }

    debug!(item_id = %item_id, quantity = %quantity, "Stock deducted");

    Ok(DeductOutcome::Deducted(PriceSnapshot {
        name,
        unit_price_paisa,
    }))
}

/// Restores previously deducted stock (cancellation, approved returns).
///
/// Best-effort: if the item was deleted since it was billed, the restore is
/// logged and skipped rather than failing the caller's transaction.
/// Returns `true` when stock was actually restored.
pub async fn restore_stock(
    conn: &mut SqliteConnection,
    item_id: &str,
    quantity: i64,
) -> DbResult<bool> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE items
        SET stock_quantity = stock_quantity + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(item_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(item_id = %item_id, quantity = %quantity, "Stock restore skipped: item no longer exists");
        return Ok(false);
    }

    debug!(item_id = %item_id, quantity = %quantity, "Stock restored");
    Ok(true)
}

/// Gets an item on the caller's transaction.
///
/// Order placement reads the selling price through this in the same unit of
/// work that writes the line snapshot.
pub async fn find_by_id(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<Item>> {
    let item: Option<Item> = sqlx::query_as(
        r#"
        SELECT
            id, shop_id, category_id, subcategory_id, location_id,
            name, part_number, purchase_price_paisa, selling_price_paisa,
            stock_quantity, created_at, updated_at
        FROM items
        WHERE id = ?1 AND shop_id = ?2
        "#,
    )
    .bind(id)
    .bind(shop_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(item)
}

// =============================================================================
// Delete Guard
// =============================================================================

/// Structured result of the pre-delete reference check.
///
/// Items tied to billing or order history cannot be deleted: their line
/// snapshots reference them and the history must stay auditable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteGuard {
    pub invoice_lines: i64,
    pub order_lines: i64,
}

impl DeleteGuard {
    /// True when deletion must be refused.
    pub fn is_blocked(&self) -> bool {
        self.invoice_lines > 0 || self.order_lines > 0
    }

    /// Human-readable reason, or `None` when deletion is allowed.
    pub fn reason(&self) -> Option<String> {
        if !self.is_blocked() {
            return None;
        }
        Some(format!(
            "referenced by {} invoice line(s) and {} order line(s)",
            self.invoice_lines, self.order_lines
        ))
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for item database operations.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Gets an item by ID within a shop.
    pub async fn get_by_id(&self, shop_id: &str, id: &str) -> DbResult<Option<Item>> {
        let item: Option<Item> = sqlx::query_as(
            r#"
            SELECT
                id, shop_id, category_id, subcategory_id, location_id,
                name, part_number, purchase_price_paisa, selling_price_paisa,
                stock_quantity, created_at, updated_at
            FROM items
            WHERE id = ?1 AND shop_id = ?2
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists a shop's items, sorted by name.
    pub async fn list(&self, shop_id: &str) -> DbResult<Vec<Item>> {
        let items: Vec<Item> = sqlx::query_as(
            r#"
            SELECT
                id, shop_id, category_id, subcategory_id, location_id,
                name, part_number, purchase_price_paisa, selling_price_paisa,
                stock_quantity, created_at, updated_at
            FROM items
            WHERE shop_id = ?1
            ORDER BY name
            "#,
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Counts a shop's items.
    pub async fn count(&self, shop_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE shop_id = ?1")
            .bind(shop_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Inserts an item.
    pub async fn insert(&self, item: &Item) -> DbResult<()> {
        debug!(id = %item.id, name = %item.name, "Inserting item");

        sqlx::query(
            r#"
            INSERT INTO items (
                id, shop_id, category_id, subcategory_id, location_id,
                name, part_number, purchase_price_paisa, selling_price_paisa,
                stock_quantity, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&item.id)
        .bind(&item.shop_id)
        .bind(&item.category_id)
        .bind(&item.subcategory_id)
        .bind(&item.location_id)
        .bind(&item.name)
        .bind(&item.part_number)
        .bind(item.purchase_price_paisa)
        .bind(item.selling_price_paisa)
        .bind(item.stock_quantity)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Checks whether an item can be deleted.
    ///
    /// Returns the reference counts so callers can present a remediation
    /// flow instead of a bare refusal.
    pub async fn can_delete(&self, shop_id: &str, item_id: &str) -> DbResult<DeleteGuard> {
        let invoice_lines: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM invoice_items li
            INNER JOIN invoices i ON i.id = li.invoice_id
            WHERE li.item_id = ?1 AND i.shop_id = ?2
            "#,
        )
        .bind(item_id)
        .bind(shop_id)
        .fetch_one(&self.pool)
        .await?;

        let order_lines: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM order_items li
            INNER JOIN orders o ON o.id = li.order_id
            WHERE li.item_id = ?1 AND o.shop_id = ?2
            "#,
        )
        .bind(item_id)
        .bind(shop_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(DeleteGuard {
            invoice_lines,
            order_lines,
        })
    }

    /// Deletes an item, refusing when billing or order history references it.
    pub async fn delete(&self, shop_id: &str, item_id: &str) -> DbResult<()> {
        let guard = self.can_delete(shop_id, item_id).await?;
        if let Some(reason) = guard.reason() {
            return Err(DbError::delete_blocked("Item", reason));
        }

        let result = sqlx::query("DELETE FROM items WHERE id = ?1 AND shop_id = ?2")
            .bind(item_id)
            .bind(shop_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", item_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use khata_core::DEFAULT_SHOP_ID;
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn test_item(stock: i64, price: i64) -> Item {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4().to_string(),
            shop_id: DEFAULT_SHOP_ID.to_string(),
            category_id: None,
            subcategory_id: None,
            location_id: None,
            name: "Brake Pad".to_string(),
            part_number: Some("BP-100".to_string()),
            purchase_price_paisa: price / 2,
            selling_price_paisa: price,
            stock_quantity: stock,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_deduct_and_restore() {
        let db = test_db().await;
        let item = test_item(10, 5000);
        db.items().insert(&item).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let outcome = deduct_stock(&mut tx, DEFAULT_SHOP_ID, &item.id, 4)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            outcome,
            DeductOutcome::Deducted(PriceSnapshot {
                name: "Brake Pad".to_string(),
                unit_price_paisa: 5000,
            })
        );

        let reloaded = db
            .items()
            .get_by_id(DEFAULT_SHOP_ID, &item.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.stock_quantity, 6);

        let mut tx = db.pool().begin().await.unwrap();
        assert!(restore_stock(&mut tx, &item.id, 4).await.unwrap());
        tx.commit().await.unwrap();

        let reloaded = db
            .items()
            .get_by_id(DEFAULT_SHOP_ID, &item.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_deduct_insufficient_leaves_stock_untouched() {
        let db = test_db().await;
        let item = test_item(3, 5000);
        db.items().insert(&item).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let outcome = deduct_stock(&mut tx, DEFAULT_SHOP_ID, &item.id, 5)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            outcome,
            DeductOutcome::Insufficient {
                name: "Brake Pad".to_string(),
                available: 3,
            }
        );

        let reloaded = db
            .items()
            .get_by_id(DEFAULT_SHOP_ID, &item.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.stock_quantity, 3);
    }

    #[tokio::test]
    async fn test_deduct_unknown_item() {
        let db = test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        let outcome = deduct_stock(&mut tx, DEFAULT_SHOP_ID, "no-such-id", 1)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(outcome, DeductOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_restore_missing_item_is_non_fatal() {
        let db = test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        let restored = restore_stock(&mut tx, "no-such-id", 2).await.unwrap();
        tx.commit().await.unwrap();

        assert!(!restored);
    }

    #[tokio::test]
    async fn test_delete_guard_counts() {
        let db = test_db().await;
        let item = test_item(1, 100);
        db.items().insert(&item).await.unwrap();

        let guard = db
            .items()
            .can_delete(DEFAULT_SHOP_ID, &item.id)
            .await
            .unwrap();
        assert!(!guard.is_blocked());
        assert_eq!(guard.reason(), None);

        db.items().delete(DEFAULT_SHOP_ID, &item.id).await.unwrap();
        assert!(db
            .items()
            .get_by_id(DEFAULT_SHOP_ID, &item.id)
            .await
            .unwrap()
            .is_none());
    }
}
