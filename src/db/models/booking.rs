//! Booking models and the booking status state machine.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::{deserialize_optional_f64, deserialize_optional_i64};

/// `pending -> {approved, rejected}`; both outcomes are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }

    /// Whether a landlord may move a booking from `self` to `next`.
    ///
    /// Re-applying the current terminal status is accepted as a no-op.
    pub fn can_become(&self, next: BookingStatus) -> bool {
        match (self, next) {
            (_, BookingStatus::Pending) => false,
            (BookingStatus::Pending, _) => true,
            (current, next) => *current == next,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "approved" => Ok(BookingStatus::Approved),
            "rejected" => Ok(BookingStatus::Rejected),
            _ => Err(format!("Unknown booking status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub property_id: String,
    pub tenant_id: String,
    /// Copied from the property when the booking is created
    pub landlord_id: String,
    pub move_in_date: String,
    pub move_out_date: String,
    pub duration_years: i64,
    pub monthly_rent: f64,
    pub deposit_amount: f64,
    pub status: String,
    pub contract_agreed_at: Option<String>,
    pub created_at: String,
}

impl Booking {
    pub fn status_enum(&self) -> BookingStatus {
        self.status.parse().unwrap_or(BookingStatus::Pending)
    }
}

/// A booking with the display fields of its property.
///
/// Title and address are absent when the property has since been removed.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BookingWithProperty {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub title: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub property_id: String,
    pub move_in_date: String,
    #[serde(default)]
    pub move_out_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub duration_years: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub monthly_rent: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub deposit_amount: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    pub message: String,
    pub booking_id: String,
}
