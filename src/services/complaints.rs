//! Complaint tracker. Tenants file complaints against their bookings; the
//! booking's landlord or an administrator resolves them.

use tracing::info;
use uuid::Uuid;

use crate::db::{
    normalize_json_field, now_timestamp, Booking, Complaint, ComplaintRow, ComplaintStatus,
    CreateComplaintRequest, DbPool, Role, UpdateComplaintStatusRequest,
};
use crate::validation::validate_required;

use super::access::{require_owner, require_owner_or_admin, Caller};
use super::error::{ServiceError, ServiceResult};

pub struct ComplaintService {
    db: DbPool,
}

impl ComplaintService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, caller: &Caller, req: CreateComplaintRequest) -> ServiceResult<Complaint> {
        let booking: Booking = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
            .bind(&req.booking_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Booking not found"))?;

        require_owner(caller, &booking.tenant_id, "Only tenant can create complaint")?;
        validate_required(&req.title, "Title").map_err(|e| ServiceError::validation("title", e))?;

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO complaints (id, booking_id, tenant_id, landlord_id, title, description,
                                    category, severity, images, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&booking.id)
        .bind(&caller.id)
        .bind(&booking.landlord_id)
        .bind(req.title.trim())
        .bind(req.description.as_deref().unwrap_or_default())
        .bind(req.category.as_deref().filter(|c| !c.is_empty()).unwrap_or("other"))
        .bind(req.severity.as_deref().filter(|s| !s.is_empty()).unwrap_or("medium"))
        .bind(normalize_json_field(req.images.as_ref()))
        .bind(ComplaintStatus::Open.as_str())
        .bind(now_timestamp())
        .execute(&self.db)
        .await?;

        info!(complaint_id = %id, booking_id = %booking.id, "Complaint filed");
        self.get(&id).await
    }

    /// Move a complaint between open and resolved.
    ///
    /// `resolved_at` is stamped on the way into `resolved` and cleared on the
    /// way out. Absent remarks or resolution text keep their stored values.
    pub async fn set_status(
        &self,
        caller: &Caller,
        complaint_id: &str,
        req: UpdateComplaintStatusRequest,
    ) -> ServiceResult<Complaint> {
        let status: ComplaintStatus = req
            .status
            .parse()
            .map_err(|e| ServiceError::validation("status", e))?;

        let complaint = self.get(complaint_id).await?;
        if caller.role == Role::Tenant {
            return Err(ServiceError::forbidden(
                "Only the landlord or an administrator can update a complaint",
            ));
        }
        require_owner_or_admin(caller, &complaint.landlord_id, "Unauthorized")?;

        let now = now_timestamp();
        sqlx::query(
            r#"
            UPDATE complaints SET
                status = ?,
                admin_remarks = COALESCE(?, admin_remarks),
                resolution = COALESCE(?, resolution),
                resolved_at = CASE WHEN ? = 'resolved' THEN COALESCE(resolved_at, ?) ELSE NULL END
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(&req.admin_remarks)
        .bind(&req.resolution)
        .bind(status.as_str())
        .bind(&now)
        .bind(complaint_id)
        .execute(&self.db)
        .await?;

        info!(complaint_id = %complaint_id, status = status.as_str(), "Complaint updated");
        self.get(complaint_id).await
    }

    /// Complaints where the caller is the tenant or the landlord, newest first
    pub async fn list_for_user(&self, caller: &Caller) -> ServiceResult<Vec<Complaint>> {
        let rows: Vec<ComplaintRow> = sqlx::query_as(
            "SELECT * FROM complaints WHERE tenant_id = ? OR landlord_id = ? ORDER BY created_at DESC",
        )
        .bind(&caller.id)
        .bind(&caller.id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Complaint::from).collect())
    }

    pub async fn get(&self, complaint_id: &str) -> ServiceResult<Complaint> {
        let row: ComplaintRow = sqlx::query_as("SELECT * FROM complaints WHERE id = ?")
            .bind(complaint_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Complaint not found"))?;
        Ok(row.into())
    }
}
