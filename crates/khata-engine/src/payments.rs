//! # Ledger Payments
//!
//! Standalone payments against a customer's running balance: the retailer
//! walks in and settles part of their khata, outside any invoice.

use tracing::info;

use crate::error::EngineResult;
use khata_core::{validation, LedgerEntry, LedgerEntryType, Money};
use khata_db::repository::ledger;
use khata_db::Database;

/// Records a payment: one credit entry, debt goes down.
///
/// `description` defaults to "Cash Payment" when the cashier leaves it
/// blank.
pub async fn record_payment(
    db: &Database,
    shop_id: &str,
    customer_id: &str,
    amount_paisa: i64,
    description: Option<&str>,
) -> EngineResult<LedgerEntry> {
    validation::validate_positive_amount_paisa(amount_paisa, "amount")?;

    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or("Cash Payment");

    let mut tx = db.pool().begin().await?;

    let entry = ledger::post(
        &mut tx,
        shop_id,
        customer_id,
        LedgerEntryType::Credit,
        Money::from_paisa(amount_paisa),
        description,
        None,
    )
    .await?;

    tx.commit().await?;

    info!(
        customer_id = %customer_id,
        amount = %entry.amount(),
        balance_after = %entry.balance_after(),
        "Payment recorded"
    );

    Ok(entry)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::testutil;
    use khata_core::DEFAULT_SHOP_ID;

    #[tokio::test]
    async fn test_payment_reduces_debt() {
        let db = testutil::test_db().await;
        let retailer = testutil::seed_retailer(&db, "Bilal Autos", "0301-0000001").await;
        testutil::post_opening_debit(&db, &retailer.id, 1_000).await;

        let entry = record_payment(&db, DEFAULT_SHOP_ID, &retailer.id, 400, None)
            .await
            .unwrap();

        assert_eq!(entry.description, "Cash Payment");
        assert_eq!(entry.balance_after_paisa, 600);

        let account = db
            .customers()
            .get_by_id(DEFAULT_SHOP_ID, &retailer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.current_balance_paisa, 600);
        assert_eq!(
            db.ledger()
                .signed_sum(DEFAULT_SHOP_ID, &retailer.id)
                .await
                .unwrap(),
            600
        );
    }

    #[tokio::test]
    async fn test_zero_payment_rejected() {
        let db = testutil::test_db().await;
        let retailer = testutil::seed_retailer(&db, "Bilal Autos", "0301-0000001").await;

        let err = record_payment(&db, DEFAULT_SHOP_ID, &retailer.id, 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_payment_for_unknown_customer() {
        let db = testutil::test_db().await;

        let err = record_payment(&db, DEFAULT_SHOP_ID, "no-such-customer", 100, Some("settle"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
