//! Admin dashboard counters.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Approved accounts, administrators excluded
    pub total_users: i64,
    /// Approved listings, booked or not
    pub total_properties: i64,
    pub total_bookings: i64,
    /// Payments marked completed
    pub total_payments: i64,
}
