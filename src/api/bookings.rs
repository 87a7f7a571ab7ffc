//! Booking endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use crate::db::{
    BookingWithProperty, CreateBookingRequest, CreateBookingResponse, UpdateBookingStatusRequest,
};
use crate::services::Caller;
use crate::AppState;

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), ApiError> {
    let booking = state.bookings.create(&caller, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            message: "Booking created successfully".to_string(),
            booking_id: booking.id,
        }),
    ))
}

/// Bookings where the user is tenant or landlord, newest first
pub async fn list_user_bookings(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<BookingWithProperty>>, ApiError> {
    let bookings = state.bookings.list_for_user(&caller, &user_id).await?;
    Ok(Json(bookings))
}

/// Landlord decision: approve or reject
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let booking = state
        .bookings
        .set_status(&caller, &id, &request.status)
        .await?;

    Ok(Json(json!({
        "message": format!("Booking {}", booking.status),
        "booking": booking,
    })))
}

pub async fn agree_contract(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let booking = state.bookings.agree_contract(&caller, &id).await?;

    Ok(Json(json!({
        "message": "Contract agreed",
        "booking": booking,
    })))
}
