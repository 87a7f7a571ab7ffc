//! Payment ledger models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::{deserialize_optional_f64, deserialize_optional_i64};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub booking_id: String,
    pub tenant_id: String,
    pub landlord_id: String,
    pub amount: f64,
    pub payment_type: String,
    pub payment_method: String,
    pub status: String,
    pub due_date: Option<String>,
    pub payment_date: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub booking_id: String,
    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePaymentRequest {
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositPaymentRequest {
    pub booking_id: String,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub months_paid: Option<i64>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Split of an upfront payment covering `months` of rent.
///
/// The security deposit is deducted from the first month, so the total is
/// always `monthly_rent * months`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBreakdown {
    pub deposit: f64,
    pub first_month_balance: f64,
    pub additional_months: i64,
    pub additional_months_total: f64,
    pub total_payment: f64,
}

impl PaymentBreakdown {
    pub fn compute(monthly_rent: f64, deposit: f64, months: i64) -> Self {
        let additional_months = months - 1;
        Self {
            deposit,
            first_month_balance: monthly_rent - deposit,
            additional_months,
            additional_months_total: additional_months as f64 * monthly_rent,
            total_payment: monthly_rent * months as f64,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub message: String,
    pub payment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<PaymentBreakdown>,
}
