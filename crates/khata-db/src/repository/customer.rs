//! # Customer Repository
//!
//! Database operations for customer accounts (B2B retailers and walk-ins).
//!
//! ## Walk-in Accounts
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  Walk-in Account Creation                           │
//! │                                                                     │
//! │  A first-time walk-in sale creates a real account keyed on the      │
//! │  phone number, so the customer's purchases and any credit they      │
//! │  take accumulate on one ledger from day one:                        │
//! │                                                                     │
//! │    • name as entered at the counter (or a default)                  │
//! │    • argon2 hash of the default password                            │
//! │    • customer_type = walkin, zero credit limit, zero balance        │
//! │                                                                     │
//! │  The UNIQUE constraint on phone is the backstop for two             │
//! │  concurrent first-time sales with the same number: the second       │
//! │  insert fails, its transaction rolls back, and a retry finds the    │
//! │  account created by the first.                                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHasher,
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use khata_core::{Customer, CustomerType};

/// Default password for implicitly created walk-in accounts.
///
/// Walk-ins rarely log in; the account exists to anchor their ledger. A
/// staff member resets the password if the customer ever wants portal
/// access.
const DEFAULT_WALKIN_PASSWORD: &str = "123456";

const CUSTOMER_COLUMNS: &str = r#"
    id, shop_id, name, phone, password_hash, customer_type,
    credit_limit_paisa, current_balance_paisa, created_at, updated_at
"#;

/// Hashes a password for storage.
fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Looks up a customer account by phone within a shop.
///
/// Runs on the caller's transaction so the lookup and any subsequent
/// creation belong to the same unit of work.
pub async fn find_by_phone(
    conn: &mut SqliteConnection,
    shop_id: &str,
    phone: &str,
) -> DbResult<Option<Customer>> {
    let customer: Option<Customer> = sqlx::query_as(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE shop_id = ?1 AND phone = ?2"
    ))
    .bind(shop_id)
    .bind(phone)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

/// Gets a customer by ID on the caller's transaction.
pub async fn find_by_id(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<Customer>> {
    let customer: Option<Customer> = sqlx::query_as(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1 AND shop_id = ?2"
    ))
    .bind(id)
    .bind(shop_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

/// Creates a walk-in account with defaults: generated password hash,
/// `customer_type = walkin`, zero credit limit, zero balance.
pub async fn create_walkin(
    conn: &mut SqliteConnection,
    shop_id: &str,
    name: &str,
    phone: &str,
) -> DbResult<Customer> {
    let now = Utc::now();
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        shop_id: shop_id.to_string(),
        name: name.to_string(),
        phone: Some(phone.to_string()),
        password_hash: hash_password(DEFAULT_WALKIN_PASSWORD)?,
        customer_type: CustomerType::Walkin,
        credit_limit_paisa: 0,
        current_balance_paisa: 0,
        created_at: now,
        updated_at: now,
    };

    insert_on(conn, &customer).await?;

    info!(customer_id = %customer.id, phone = %phone, "Walk-in account created");

    Ok(customer)
}

/// Inserts a customer row on the caller's transaction.
pub async fn insert_on(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO customers (
            id, shop_id, name, phone, password_hash, customer_type,
            credit_limit_paisa, current_balance_paisa, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.shop_id)
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(&customer.password_hash)
    .bind(customer.customer_type)
    .bind(customer.credit_limit_paisa)
    .bind(customer.current_balance_paisa)
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID within a shop.
    pub async fn get_by_id(&self, shop_id: &str, id: &str) -> DbResult<Option<Customer>> {
        let customer: Option<Customer> = sqlx::query_as(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1 AND shop_id = ?2"
        ))
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists a shop's customers, sorted by name.
    pub async fn list(&self, shop_id: &str) -> DbResult<Vec<Customer>> {
        let customers: Vec<Customer> = sqlx::query_as(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE shop_id = ?1 ORDER BY name"
        ))
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Creates a B2B retailer account.
    pub async fn create_retailer(
        &self,
        shop_id: &str,
        name: &str,
        phone: Option<&str>,
        password: &str,
        credit_limit_paisa: i64,
    ) -> DbResult<Customer> {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            shop_id: shop_id.to_string(),
            name: name.to_string(),
            phone: phone.map(|p| p.to_string()),
            password_hash: hash_password(password)?,
            customer_type: CustomerType::B2b,
            credit_limit_paisa,
            current_balance_paisa: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(customer_id = %customer.id, name = %name, "Creating retailer account");

        let mut conn = self.pool.acquire().await?;
        insert_on(&mut conn, &customer).await?;

        Ok(customer)
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

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_walkin_defaults() {
        let db = test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        let created = create_walkin(&mut tx, DEFAULT_SHOP_ID, "Ali", "0300-1112223")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(created.customer_type, CustomerType::Walkin);
        assert_eq!(created.credit_limit_paisa, 0);
        assert_eq!(created.current_balance_paisa, 0);
        assert!(created.password_hash.starts_with("$argon2"));

        let found = db
            .customers()
            .get_by_id(DEFAULT_SHOP_ID, &created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.phone.as_deref(), Some("0300-1112223"));
    }

    #[tokio::test]
    async fn test_duplicate_phone_rejected() {
        let db = test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        create_walkin(&mut tx, DEFAULT_SHOP_ID, "Ali", "0300-1112223")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let err = create_walkin(&mut tx, DEFAULT_SHOP_ID, "Other Ali", "0300-1112223")
            .await
            .unwrap_err();
        tx.rollback().await.unwrap();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_find_by_phone() {
        let db = test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        let created = create_walkin(&mut tx, DEFAULT_SHOP_ID, "Ali", "0300-1112223")
            .await
            .unwrap();

        let found = find_by_phone(&mut tx, DEFAULT_SHOP_ID, "0300-1112223")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);

        let missing = find_by_phone(&mut tx, DEFAULT_SHOP_ID, "0300-9999999")
            .await
            .unwrap();
        assert!(missing.is_none());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_retailer() {
        let db = test_db().await;

        let retailer = db
            .customers()
            .create_retailer(DEFAULT_SHOP_ID, "Bilal Autos", Some("0301-5556667"), "secret", 500_000)
            .await
            .unwrap();

        assert_eq!(retailer.customer_type, CustomerType::B2b);
        assert_eq!(retailer.credit_limit_paisa, 500_000);
    }
}
