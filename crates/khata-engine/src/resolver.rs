//! # Customer Resolver
//!
//! Resolves a sale's counterparty to a customer account, creating a walk-in
//! account on first contact by phone number.
//!
//! ## Resolution Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Customer Resolution                              │
//! │                                                                     │
//! │  Retailer { customer_id }                                           │
//! │       └── account must pre-exist in shop scope → Existing(id)       │
//! │                                                                     │
//! │  WalkIn { name, phone }                                             │
//! │       ├── phone missing → rejected at the boundary                  │
//! │       ├── phone known   → Existing(id)  (stored name wins)          │
//! │       └── phone new     → create account with defaults →            │
//! │                           Created(id)                               │
//! │                                                                     │
//! │  Runs on the billing transaction: lookup and creation belong to     │
//! │  the same unit of work as the sale they anchor. Two concurrent      │
//! │  first sales with one new phone cannot both create an account -     │
//! │  the UNIQUE constraint fails the second transaction whole.          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use khata_core::{validation, CustomerResolution, DEFAULT_WALKIN_NAME};
use khata_db::repository::customer;

/// How the caller identifies the customer of a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum CustomerSelection {
    /// A pre-onboarded account, picked from the directory.
    Retailer { customer_id: String },
    /// A counter customer, identified by phone.
    WalkIn {
        name: Option<String>,
        phone: Option<String>,
    },
}

/// A resolved counterparty, with the display fields the invoice header
/// snapshots.
#[derive(Debug, Clone)]
pub struct ResolvedCustomer {
    pub resolution: CustomerResolution,
    pub name: String,
    pub phone: Option<String>,
}

impl ResolvedCustomer {
    /// The resolved account id.
    pub fn customer_id(&self) -> &str {
        self.resolution.customer_id()
    }
}

/// Resolves a customer selection on the caller's transaction.
pub async fn resolve(
    conn: &mut SqliteConnection,
    shop_id: &str,
    selection: &CustomerSelection,
) -> EngineResult<ResolvedCustomer> {
    match selection {
        CustomerSelection::Retailer { customer_id } => {
            let account = customer::find_by_id(conn, shop_id, customer_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Customer", customer_id.as_str()))?;

            Ok(ResolvedCustomer {
                resolution: CustomerResolution::Existing(account.id),
                name: account.name,
                phone: account.phone,
            })
        }

        CustomerSelection::WalkIn { name, phone } => {
            // Walk-in without a phone is disallowed at the boundary: the
            // phone is the only durable identity a counter customer has.
            let phone = phone.as_deref().ok_or_else(|| {
                EngineError::validation("customer phone is required for walk-in sales")
            })?;
            let phone = validation::validate_phone(phone)?;

            if let Some(account) = customer::find_by_phone(conn, shop_id, &phone).await? {
                debug!(customer_id = %account.id, "Walk-in phone matched existing account");
                // The stored name wins over whatever was typed this time.
                return Ok(ResolvedCustomer {
                    resolution: CustomerResolution::Existing(account.id),
                    name: account.name,
                    phone: account.phone,
                });
            }

            let display_name = name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_WALKIN_NAME);

            let account = customer::create_walkin(conn, shop_id, display_name, &phone).await?;

            Ok(ResolvedCustomer {
                resolution: CustomerResolution::Created(account.id),
                name: account.name,
                phone: account.phone,
            })
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use khata_core::{CustomerType, DEFAULT_SHOP_ID};

    #[tokio::test]
    async fn test_retailer_must_exist() {
        let db = testutil::test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = resolve(
            &mut tx,
            DEFAULT_SHOP_ID,
            &CustomerSelection::Retailer {
                customer_id: "no-such-account".into(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_walkin_requires_phone() {
        let db = testutil::test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = resolve(
            &mut tx,
            DEFAULT_SHOP_ID,
            &CustomerSelection::WalkIn {
                name: Some("Ali".into()),
                phone: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_walkin_get_or_create() {
        let db = testutil::test_db().await;

        // First contact creates an account.
        let mut tx = db.pool().begin().await.unwrap();
        let first = resolve(
            &mut tx,
            DEFAULT_SHOP_ID,
            &CustomerSelection::WalkIn {
                name: Some("Ali".into()),
                phone: Some("0300-7778889".into()),
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(first.resolution.was_created());
        assert_eq!(first.name, "Ali");

        let account = db
            .customers()
            .get_by_id(DEFAULT_SHOP_ID, first.customer_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.customer_type, CustomerType::Walkin);
        assert_eq!(account.credit_limit_paisa, 0);

        // Second contact reuses it, keeping the stored name.
        let mut tx = db.pool().begin().await.unwrap();
        let second = resolve(
            &mut tx,
            DEFAULT_SHOP_ID,
            &CustomerSelection::WalkIn {
                name: Some("Someone Else".into()),
                phone: Some("0300-7778889".into()),
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(!second.resolution.was_created());
        assert_eq!(second.customer_id(), first.customer_id());
        assert_eq!(second.name, "Ali");
    }

    #[tokio::test]
    async fn test_walkin_blank_name_gets_default() {
        let db = testutil::test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        let resolved = resolve(
            &mut tx,
            DEFAULT_SHOP_ID,
            &CustomerSelection::WalkIn {
                name: Some("   ".into()),
                phone: Some("0300-1231234".into()),
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(resolved.name, DEFAULT_WALKIN_NAME);
    }
}
