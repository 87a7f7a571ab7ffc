//! Complaint endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use crate::db::{
    Complaint, CreateComplaintRequest, CreateComplaintResponse, UpdateComplaintStatusRequest,
};
use crate::services::Caller;
use crate::AppState;

pub async fn create_complaint(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(request): Json<CreateComplaintRequest>,
) -> Result<(StatusCode, Json<CreateComplaintResponse>), ApiError> {
    let complaint = state.complaints.create(&caller, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateComplaintResponse {
            message: "Complaint created".to_string(),
            complaint_id: complaint.id,
        }),
    ))
}

pub async fn list_complaints(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    let complaints = state.complaints.list_for_user(&caller).await?;
    Ok(Json(complaints))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(request): Json<UpdateComplaintStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let complaint = state.complaints.set_status(&caller, &id, request).await?;

    Ok(Json(json!({
        "message": "Complaint updated",
        "complaint": complaint,
    })))
}
