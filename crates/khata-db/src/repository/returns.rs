//! # Return Request Repository
//!
//! Database operations for return requests.
//!
//! ## Status Transitions
//! A request is decided at most once. Both transitions out of `pending`
//! are guarded UPDATEs, so a double-submit (or two reviewers racing) leaves
//! exactly one decision recorded; the loser sees zero rows affected.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use khata_core::ReturnRequest;

const RETURN_COLUMNS: &str = r#"
    id, shop_id, retailer_id, order_id, item_id, quantity, reason,
    status, ledger_entry_id, created_at, updated_at
"#;

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Inserts a return request on the caller's transaction.
pub async fn insert(conn: &mut SqliteConnection, request: &ReturnRequest) -> DbResult<()> {
    debug!(id = %request.id, order_id = %request.order_id, "Inserting return request");

    sqlx::query(
        r#"
        INSERT INTO return_requests (
            id, shop_id, retailer_id, order_id, item_id, quantity, reason,
            status, ledger_entry_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&request.id)
    .bind(&request.shop_id)
    .bind(&request.retailer_id)
    .bind(&request.order_id)
    .bind(&request.item_id)
    .bind(request.quantity)
    .bind(&request.reason)
    .bind(request.status)
    .bind(&request.ledger_entry_id)
    .bind(request.created_at)
    .bind(request.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets a return request on the caller's transaction.
pub async fn find_by_id(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<ReturnRequest>> {
    let request: Option<ReturnRequest> = sqlx::query_as(&format!(
        "SELECT {RETURN_COLUMNS} FROM return_requests WHERE id = ?1 AND shop_id = ?2"
    ))
    .bind(id)
    .bind(shop_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(request)
}

/// Moves a pending request to `rejected`. Returns `false` when the request
/// already left `pending`.
pub async fn mark_rejected(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let now = chrono::Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE return_requests
        SET status = 'rejected', updated_at = ?2
        WHERE id = ?1 AND status = 'pending'
        "#,
    )
    .bind(id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Moves a pending request to `approved`, linking the credit note entry.
/// Returns `false` when the request already left `pending`.
pub async fn mark_approved(
    conn: &mut SqliteConnection,
    id: &str,
    ledger_entry_id: &str,
) -> DbResult<bool> {
    let now = chrono::Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE return_requests
        SET status = 'approved', ledger_entry_id = ?2, updated_at = ?3
        WHERE id = ?1 AND status = 'pending'
        "#,
    )
    .bind(id)
    .bind(ledger_entry_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for return-request reads.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    /// Creates a new ReturnRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Gets a return request by ID within a shop.
    pub async fn get_by_id(&self, shop_id: &str, id: &str) -> DbResult<Option<ReturnRequest>> {
        let mut conn = self.pool.acquire().await?;
        find_by_id(&mut conn, shop_id, id).await
    }

    /// Lists a shop's return requests, newest first.
    pub async fn list(&self, shop_id: &str) -> DbResult<Vec<ReturnRequest>> {
        let requests: Vec<ReturnRequest> = sqlx::query_as(&format!(
            "SELECT {RETURN_COLUMNS} FROM return_requests WHERE shop_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }
}
