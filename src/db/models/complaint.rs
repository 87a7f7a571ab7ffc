//! Complaint models.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::common::decode_string_list;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplaintStatus {
    Open,
    Resolved,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Open => "open",
            ComplaintStatus::Resolved => "resolved",
        }
    }
}

impl std::str::FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" | "pending" => Ok(ComplaintStatus::Open),
            "resolved" => Ok(ComplaintStatus::Resolved),
            _ => Err(format!("Unknown complaint status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ComplaintRow {
    pub id: String,
    pub booking_id: String,
    pub tenant_id: String,
    pub landlord_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub severity: String,
    pub images: String,
    pub status: String,
    pub admin_remarks: Option<String>,
    pub resolution: Option<String>,
    pub resolved_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: String,
    pub booking_id: String,
    pub tenant_id: String,
    pub landlord_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub severity: String,
    pub images: Vec<String>,
    pub status: String,
    pub admin_remarks: Option<String>,
    pub resolution: Option<String>,
    pub resolved_at: Option<String>,
    pub created_at: String,
}

impl From<ComplaintRow> for Complaint {
    fn from(row: ComplaintRow) -> Self {
        Self {
            images: decode_string_list(&row.images),
            id: row.id,
            booking_id: row.booking_id,
            tenant_id: row.tenant_id,
            landlord_id: row.landlord_id,
            title: row.title,
            description: row.description,
            category: row.category,
            severity: row.severity,
            status: row.status,
            admin_remarks: row.admin_remarks,
            resolution: row.resolution,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintRequest {
    pub booking_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub images: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComplaintStatusRequest {
    pub status: String,
    #[serde(default)]
    pub admin_remarks: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintResponse {
    pub message: String,
    pub complaint_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_pending_status_means_open() {
        assert_eq!("pending".parse::<ComplaintStatus>().unwrap(), ComplaintStatus::Open);
        assert_eq!("Resolved".parse::<ComplaintStatus>().unwrap(), ComplaintStatus::Resolved);
        assert!("closed".parse::<ComplaintStatus>().is_err());
    }
}
