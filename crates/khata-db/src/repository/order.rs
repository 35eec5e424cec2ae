//! # Order Repository
//!
//! Database operations for B2B orders and their lines.
//!
//! ## Status Transitions
//! Status changes that gate financial side effects are guarded UPDATEs
//! (`WHERE status = 'pending'`): the transition and its precondition are one
//! statement, so two concurrent dispatches of the same order cannot both
//! pass the check. The loser sees zero rows affected.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use khata_core::{DeliveryType, Order, OrderItem, OrderStatus};

/// Generates an order number in format: ORD-XXXXXX
pub fn generate_order_number() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("ORD-{}", &id[..6])
}

const ORDER_COLUMNS: &str = r#"
    id, shop_id, retailer_id, invoice_id, order_number, status,
    delivery_type, driver_id, driver_name, vehicle_details,
    created_at, updated_at
"#;

const ORDER_ITEM_COLUMNS: &str = r#"
    id, order_id, item_id, requested_qty, fulfilled_qty,
    unit_price_paisa, created_at
"#;

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Inserts an order header on the caller's transaction.
pub async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    debug!(id = %order.id, order_number = %order.order_number, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, shop_id, retailer_id, invoice_id, order_number, status,
            delivery_type, driver_id, driver_name, vehicle_details,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&order.id)
    .bind(&order.shop_id)
    .bind(&order.retailer_id)
    .bind(&order.invoice_id)
    .bind(&order.order_number)
    .bind(order.status)
    .bind(order.delivery_type)
    .bind(&order.driver_id)
    .bind(&order.driver_name)
    .bind(&order.vehicle_details)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts an order line on the caller's transaction.
pub async fn insert_line(conn: &mut SqliteConnection, line: &OrderItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, item_id, requested_qty, fulfilled_qty,
            unit_price_paisa, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&line.id)
    .bind(&line.order_id)
    .bind(&line.item_id)
    .bind(line.requested_qty)
    .bind(line.fulfilled_qty)
    .bind(line.unit_price_paisa)
    .bind(line.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets an order on the caller's transaction.
pub async fn find_by_id(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<Order>> {
    let order: Option<Order> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1 AND shop_id = ?2"
    ))
    .bind(id)
    .bind(shop_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(order)
}

/// Gets an order's lines on the caller's transaction.
pub async fn lines_for_order(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Vec<OrderItem>> {
    let lines: Vec<OrderItem> = sqlx::query_as(&format!(
        "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY created_at"
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

/// Finds the line for one (order, item) pair on the caller's transaction.
pub async fn find_line(
    conn: &mut SqliteConnection,
    order_id: &str,
    item_id: &str,
) -> DbResult<Option<OrderItem>> {
    let line: Option<OrderItem> = sqlx::query_as(&format!(
        "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 AND item_id = ?2"
    ))
    .bind(order_id)
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(line)
}

/// Records the fulfilled quantity on an order line.
pub async fn set_fulfilled_qty(
    conn: &mut SqliteConnection,
    line_id: &str,
    fulfilled_qty: i64,
) -> DbResult<()> {
    sqlx::query("UPDATE order_items SET fulfilled_qty = ?2 WHERE id = ?1")
        .bind(line_id)
        .bind(fulfilled_qty)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Moves a pending order to `dispatched`, linking its invoice and delivery
/// assignment. Returns `false` when the order already left `pending`.
#[allow(clippy::too_many_arguments)]
pub async fn mark_dispatched(
    conn: &mut SqliteConnection,
    shop_id: &str,
    order_id: &str,
    invoice_id: &str,
    delivery_type: DeliveryType,
    driver_id: &str,
    driver_name: &str,
    vehicle_details: Option<&str>,
) -> DbResult<bool> {
    let now = chrono::Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE orders SET
            status = 'dispatched',
            invoice_id = ?3,
            delivery_type = ?4,
            driver_id = ?5,
            driver_name = ?6,
            vehicle_details = ?7,
            updated_at = ?8
        WHERE id = ?1 AND shop_id = ?2 AND status = 'pending'
        "#,
    )
    .bind(order_id)
    .bind(shop_id)
    .bind(invoice_id)
    .bind(delivery_type)
    .bind(driver_id)
    .bind(driver_name)
    .bind(vehicle_details)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Sets an order's status unconditionally (return processing marks the
/// parent order `returned`, whatever state dispatch left it in).
pub async fn set_status(
    conn: &mut SqliteConnection,
    order_id: &str,
    status: OrderStatus,
) -> DbResult<()> {
    let now = chrono::Utc::now();
    sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(order_id)
        .bind(status)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order reads.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID within a shop.
    pub async fn get_by_id(&self, shop_id: &str, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        find_by_id(&mut conn, shop_id, id).await
    }

    /// Gets all lines for an order.
    pub async fn items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let mut conn = self.pool.acquire().await?;
        lines_for_order(&mut conn, order_id).await
    }

    /// Lists a shop's incoming orders, newest first.
    pub async fn list(&self, shop_id: &str) -> DbResult<Vec<Order>> {
        let orders: Vec<Order> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE shop_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Lists one retailer's orders, newest first.
    pub async fn list_for_retailer(&self, retailer_id: &str) -> DbResult<Vec<Order>> {
        let orders: Vec<Order> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE retailer_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(retailer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
