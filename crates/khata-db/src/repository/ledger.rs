//! # Ledger Repository
//!
//! The append-only customer credit ledger and the running balance it backs.
//!
//! ## The Posting Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                post(conn, customer, type, amount)                   │
//! │                                                                     │
//! │  1. UPDATE customers                                                │
//! │     SET current_balance_paisa = current_balance_paisa ± amount      │
//! │     WHERE id = ? AND shop_id = ?                                    │
//! │     (atomic increment - zero rows means unknown customer)           │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  2. SELECT current_balance_paisa  (same transaction)                │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  3. INSERT ledger_entries (..., balance_after = step 2)             │
//! │                                                                     │
//! │  Posting twice in one unit of work therefore yields strictly        │
//! │  causal snapshots: a sale's debit entry carries the balance         │
//! │  before the payment credit, the credit carries the final balance.   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are never updated or deleted. Corrections are additional
//! offsetting entries posted through the same primitive.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use khata_core::{LedgerEntry, LedgerEntryType, Money};

// =============================================================================
// Posting Primitive
// =============================================================================

/// Applies a ledger entry to a customer's account.
///
/// Mutates the running balance and appends the entry with its
/// `balance_after` snapshot, all on the caller's transaction. This is the
/// ONLY code path that touches `current_balance_paisa`.
pub async fn post(
    conn: &mut SqliteConnection,
    shop_id: &str,
    customer_id: &str,
    entry_type: LedgerEntryType,
    amount: Money,
    description: &str,
    reference_id: Option<&str>,
) -> DbResult<LedgerEntry> {
    let signed_paisa = match entry_type {
        LedgerEntryType::Debit => amount.paisa(),
        LedgerEntryType::Credit => -amount.paisa(),
    };

    let now = Utc::now();

    // Atomic increment: the balance read below sees the effect of this and
    // every earlier post in the same transaction.
    let result = sqlx::query(
        r#"
        UPDATE customers
        SET current_balance_paisa = current_balance_paisa + ?3, updated_at = ?4
        WHERE id = ?1 AND shop_id = ?2
        "#,
    )
    .bind(customer_id)
    .bind(shop_id)
    .bind(signed_paisa)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", customer_id));
    }

    let balance_after_paisa: i64 =
        sqlx::query_scalar("SELECT current_balance_paisa FROM customers WHERE id = ?1")
            .bind(customer_id)
            .fetch_one(&mut *conn)
            .await?;

    let entry = LedgerEntry {
        id: Uuid::new_v4().to_string(),
        shop_id: shop_id.to_string(),
        customer_id: customer_id.to_string(),
        entry_type,
        amount_paisa: amount.paisa(),
        description: description.to_string(),
        reference_id: reference_id.map(|r| r.to_string()),
        balance_after_paisa,
        entry_date: now,
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO ledger_entries (
            id, shop_id, customer_id, entry_type, amount_paisa,
            description, reference_id, balance_after_paisa, entry_date, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.shop_id)
    .bind(&entry.customer_id)
    .bind(entry.entry_type)
    .bind(entry.amount_paisa)
    .bind(&entry.description)
    .bind(&entry.reference_id)
    .bind(entry.balance_after_paisa)
    .bind(entry.entry_date)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    debug!(
        customer_id = %customer_id,
        amount = %amount,
        balance_after = %entry.balance_after(),
        "Ledger entry posted"
    );

    Ok(entry)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for ledger reads.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Gets a single entry by ID.
    pub async fn get_by_id(&self, shop_id: &str, id: &str) -> DbResult<Option<LedgerEntry>> {
        let entry: Option<LedgerEntry> = sqlx::query_as(
            r#"
            SELECT
                id, shop_id, customer_id, entry_type, amount_paisa,
                description, reference_id, balance_after_paisa, entry_date, created_at
            FROM ledger_entries
            WHERE id = ?1 AND shop_id = ?2
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// A customer's ledger, newest entry first.
    pub async fn entries_for_customer(
        &self,
        shop_id: &str,
        customer_id: &str,
    ) -> DbResult<Vec<LedgerEntry>> {
        let entries: Vec<LedgerEntry> = sqlx::query_as(
            r#"
            SELECT
                id, shop_id, customer_id, entry_type, amount_paisa,
                description, reference_id, balance_after_paisa, entry_date, created_at
            FROM ledger_entries
            WHERE shop_id = ?1 AND customer_id = ?2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(shop_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// The signed sum of a customer's entries (debits minus credits).
    ///
    /// Must always equal `customers.current_balance_paisa` - the central
    /// consistency invariant of the whole system.
    pub async fn signed_sum(&self, shop_id: &str, customer_id: &str) -> DbResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(
                CASE entry_type WHEN 'debit' THEN amount_paisa ELSE -amount_paisa END
            ), 0)
            FROM ledger_entries
            WHERE shop_id = ?1 AND customer_id = ?2
            "#,
        )
        .bind(shop_id)
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
