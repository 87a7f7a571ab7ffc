//! Administrator endpoints. Every handler needs an admin token.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use crate::db::{Complaint, DashboardStats, Property, UserSummary};
use crate::services::Caller;
use crate::AppState;

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

pub async fn pending_users(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    Ok(Json(state.admin.pending_users(&caller).await?))
}

pub async fn all_users(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    Ok(Json(state.admin.all_users(&caller).await?))
}

pub async fn approve_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.admin.approve_user(&caller, &user_id).await?;
    Ok(message("User approved"))
}

pub async fn reject_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.admin.delete_user(&caller, &user_id).await?;
    Ok(message("User rejected and removed"))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.admin.delete_user(&caller, &user_id).await?;
    Ok(message("User deleted successfully"))
}

pub async fn pending_properties(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<Property>>, ApiError> {
    Ok(Json(state.admin.pending_properties(&caller).await?))
}

pub async fn all_properties(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<Property>>, ApiError> {
    Ok(Json(state.admin.all_properties(&caller).await?))
}

pub async fn approve_property(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(property_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.admin.approve_property(&caller, &property_id).await?;
    Ok(message("Property approved"))
}

pub async fn reject_property(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(property_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.admin.reject_property(&caller, &property_id).await?;
    Ok(message("Property rejected and removed"))
}

pub async fn complaints(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    Ok(Json(state.admin.complaints(&caller).await?))
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.admin.stats(&caller).await?))
}
