//! Administrator views and approval actions.
//!
//! Rejections and deletions are hard deletes of the single row. Bookings,
//! payments and complaints referencing the removed user or property are left
//! in place.

use tracing::info;

use crate::db::{
    Complaint, ComplaintRow, DashboardStats, DbPool, PaymentStatus, Property,
    PropertyWithLandlordRow, Role, User, UserSummary,
};

use super::access::{Caller, ADMIN_ONLY};
use super::error::{ServiceError, ServiceResult};

const PROPERTIES_WITH_LANDLORD: &str = r#"
    SELECT p.*, u.name AS landlord_name, u.phone AS landlord_phone
    FROM properties p
    LEFT JOIN users u ON u.id = p.landlord_id
"#;

pub struct AdminService {
    db: DbPool,
}

impl AdminService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Non-admin accounts waiting for approval, oldest first
    pub async fn pending_users(&self, caller: &Caller) -> ServiceResult<Vec<UserSummary>> {
        ADMIN_ONLY.check(caller)?;
        let users: Vec<User> = sqlx::query_as(
            "SELECT * FROM users WHERE is_approved = 0 AND role != ? ORDER BY created_at ASC",
        )
        .bind(Role::Admin.as_str())
        .fetch_all(&self.db)
        .await?;
        Ok(users.into_iter().map(UserSummary::from).collect())
    }

    /// Every non-admin account, newest first
    pub async fn all_users(&self, caller: &Caller) -> ServiceResult<Vec<UserSummary>> {
        ADMIN_ONLY.check(caller)?;
        let users: Vec<User> =
            sqlx::query_as("SELECT * FROM users WHERE role != ? ORDER BY created_at DESC")
                .bind(Role::Admin.as_str())
                .fetch_all(&self.db)
                .await?;
        Ok(users.into_iter().map(UserSummary::from).collect())
    }

    pub async fn approve_user(&self, caller: &Caller, user_id: &str) -> ServiceResult<()> {
        ADMIN_ONLY.check(caller)?;
        let result = sqlx::query("UPDATE users SET is_approved = 1 WHERE id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found("User not found"));
        }
        info!(user_id = %user_id, admin_id = %caller.id, "User approved");
        Ok(())
    }

    /// Remove a non-admin account outright
    pub async fn delete_user(&self, caller: &Caller, user_id: &str) -> ServiceResult<()> {
        ADMIN_ONLY.check(caller)?;
        let result = sqlx::query("DELETE FROM users WHERE id = ? AND role != ?")
            .bind(user_id)
            .bind(Role::Admin.as_str())
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found("User not found"));
        }
        info!(user_id = %user_id, admin_id = %caller.id, "User removed");
        Ok(())
    }

    /// Listings waiting for approval, with the landlord's name
    pub async fn pending_properties(&self, caller: &Caller) -> ServiceResult<Vec<Property>> {
        ADMIN_ONLY.check(caller)?;
        let rows: Vec<PropertyWithLandlordRow> = sqlx::query_as(&format!(
            "{} WHERE p.is_approved = 0 ORDER BY p.created_at ASC",
            PROPERTIES_WITH_LANDLORD
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| Property::from_joined(row, true))
            .collect())
    }

    /// Every listing regardless of approval, newest first
    pub async fn all_properties(&self, caller: &Caller) -> ServiceResult<Vec<Property>> {
        ADMIN_ONLY.check(caller)?;
        let rows: Vec<PropertyWithLandlordRow> = sqlx::query_as(&format!(
            "{} ORDER BY p.created_at DESC",
            PROPERTIES_WITH_LANDLORD
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| Property::from_joined(row, true))
            .collect())
    }

    pub async fn approve_property(&self, caller: &Caller, property_id: &str) -> ServiceResult<()> {
        ADMIN_ONLY.check(caller)?;
        let result = sqlx::query("UPDATE properties SET is_approved = 1 WHERE id = ?")
            .bind(property_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found("Property not found"));
        }
        info!(property_id = %property_id, admin_id = %caller.id, "Property approved");
        Ok(())
    }

    /// Reject a listing by deleting it
    pub async fn reject_property(&self, caller: &Caller, property_id: &str) -> ServiceResult<()> {
        ADMIN_ONLY.check(caller)?;
        let result = sqlx::query("DELETE FROM properties WHERE id = ?")
            .bind(property_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found("Property not found"));
        }
        info!(property_id = %property_id, admin_id = %caller.id, "Property rejected and removed");
        Ok(())
    }

    pub async fn complaints(&self, caller: &Caller) -> ServiceResult<Vec<Complaint>> {
        ADMIN_ONLY.check(caller)?;
        let rows: Vec<ComplaintRow> =
            sqlx::query_as("SELECT * FROM complaints ORDER BY created_at DESC")
                .fetch_all(&self.db)
                .await?;
        Ok(rows.into_iter().map(Complaint::from).collect())
    }

    pub async fn stats(&self, caller: &Caller) -> ServiceResult<DashboardStats> {
        ADMIN_ONLY.check(caller)?;

        let total_users: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role != ? AND is_approved = 1")
                .bind(Role::Admin.as_str())
                .fetch_one(&self.db)
                .await?;
        let total_properties: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM properties WHERE is_approved = 1")
                .fetch_one(&self.db)
                .await?;
        let total_bookings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.db)
            .await?;
        let total_payments: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE status = ?")
                .bind(PaymentStatus::Completed.as_str())
                .fetch_one(&self.db)
                .await?;

        Ok(DashboardStats {
            total_users,
            total_properties,
            total_bookings,
            total_payments,
        })
    }
}
