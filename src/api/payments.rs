//! Payment ledger endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use crate::db::{
    CompletePaymentRequest, CreatePaymentRequest, CreatePaymentResponse, DepositPaymentRequest,
    Payment,
};
use crate::services::Caller;
use crate::AppState;

pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<CreatePaymentResponse>), ApiError> {
    let payment = state.payments.record(&caller, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePaymentResponse {
            message: "Payment created".to_string(),
            payment_id: payment.id,
            breakdown: None,
        }),
    ))
}

/// Upfront deposit plus rent for the first months of a lease
pub async fn create_deposit(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(request): Json<DepositPaymentRequest>,
) -> Result<(StatusCode, Json<CreatePaymentResponse>), ApiError> {
    let (payment, breakdown) = state.payments.deposit(&caller, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePaymentResponse {
            message: "Deposit payment created".to_string(),
            payment_id: payment.id,
            breakdown: Some(breakdown),
        }),
    ))
}

pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let payments = state.payments.list_for_user(&caller).await?;
    Ok(Json(payments))
}

/// Record the gateway's transaction id; the report is trusted as sent
pub async fn complete_payment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(request): Json<CompletePaymentRequest>,
) -> Result<Json<Value>, ApiError> {
    let payment = state
        .payments
        .complete(&caller, &id, request.transaction_id.as_deref())
        .await?;

    Ok(Json(json!({
        "message": "Payment completed",
        "payment": payment,
    })))
}
