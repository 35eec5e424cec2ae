//! # Delivery Directory Repository
//!
//! Resolves a delivery assignment (type + driver id) to a display name and
//! vehicle string. The fulfillment engine treats this as an opaque lookup:
//! it only needs something printable for the order sheet.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::DbResult;
use khata_core::{DeliveryPartner, DeliveryType, DriverInfo, StaffMember};

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Resolves a driver id within the directory the delivery type names.
///
/// Returns `None` when the id is unknown - the caller decides whether that
/// is fatal (dispatch records "Unknown" rather than failing the whole
/// transaction over a directory mismatch).
pub async fn resolve_driver(
    conn: &mut SqliteConnection,
    shop_id: &str,
    delivery_type: DeliveryType,
    driver_id: &str,
) -> DbResult<Option<DriverInfo>> {
    match delivery_type {
        DeliveryType::Partner => {
            let row: Option<(String, Option<String>)> = sqlx::query_as(
                "SELECT name, vehicle_number FROM delivery_partners WHERE id = ?1 AND shop_id = ?2",
            )
            .bind(driver_id)
            .bind(shop_id)
            .fetch_optional(&mut *conn)
            .await?;

            Ok(row.map(|(name, vehicle_number)| DriverInfo {
                name,
                vehicle_details: vehicle_number,
            }))
        }
        DeliveryType::Staff => {
            let name: Option<String> =
                sqlx::query_scalar("SELECT name FROM staff WHERE id = ?1 AND shop_id = ?2")
                    .bind(driver_id)
                    .bind(shop_id)
                    .fetch_optional(&mut *conn)
                    .await?;

            Ok(name.map(|name| DriverInfo {
                name: format!("{} (Staff)", name),
                vehicle_details: Some("Shop Vehicle".to_string()),
            }))
        }
        DeliveryType::Pickup => Ok(Some(DriverInfo {
            name: "Self Pickup".to_string(),
            vehicle_details: None,
        })),
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the delivery directory.
#[derive(Debug, Clone)]
pub struct DeliveryRepository {
    pool: SqlitePool,
}

impl DeliveryRepository {
    /// Creates a new DeliveryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DeliveryRepository { pool }
    }

    /// Registers a delivery partner.
    pub async fn create_partner(
        &self,
        shop_id: &str,
        name: &str,
        phone: Option<&str>,
        vehicle_number: Option<&str>,
    ) -> DbResult<DeliveryPartner> {
        let partner = DeliveryPartner {
            id: Uuid::new_v4().to_string(),
            shop_id: shop_id.to_string(),
            name: name.to_string(),
            phone: phone.map(|p| p.to_string()),
            vehicle_number: vehicle_number.map(|v| v.to_string()),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO delivery_partners (id, shop_id, name, phone, vehicle_number, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&partner.id)
        .bind(&partner.shop_id)
        .bind(&partner.name)
        .bind(&partner.phone)
        .bind(&partner.vehicle_number)
        .bind(partner.created_at)
        .execute(&self.pool)
        .await?;

        Ok(partner)
    }

    /// Registers a staff member.
    pub async fn create_staff(&self, shop_id: &str, name: &str) -> DbResult<StaffMember> {
        let staff = StaffMember {
            id: Uuid::new_v4().to_string(),
            shop_id: shop_id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO staff (id, shop_id, name, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&staff.id)
            .bind(&staff.shop_id)
            .bind(&staff.name)
            .bind(staff.created_at)
            .execute(&self.pool)
            .await?;

        Ok(staff)
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

    #[tokio::test]
    async fn test_resolve_partner_and_staff() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let partner = db
            .delivery()
            .create_partner(DEFAULT_SHOP_ID, "Fast Couriers", None, Some("LEB-1234"))
            .await
            .unwrap();
        let staff = db
            .delivery()
            .create_staff(DEFAULT_SHOP_ID, "Imran")
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();

        let info = resolve_driver(&mut conn, DEFAULT_SHOP_ID, DeliveryType::Partner, &partner.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.name, "Fast Couriers");
        assert_eq!(info.vehicle_details.as_deref(), Some("LEB-1234"));

        let info = resolve_driver(&mut conn, DEFAULT_SHOP_ID, DeliveryType::Staff, &staff.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.name, "Imran (Staff)");

        let missing = resolve_driver(&mut conn, DEFAULT_SHOP_ID, DeliveryType::Partner, "nope")
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
