mod admin;
mod auth;
mod bookings;
mod complaints;
pub mod error;
pub mod extract;
mod multipart;
mod payments;
mod properties;
mod users;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/google", post(auth::google));

    // Reads are public, writes check the caller in the handler
    let property_routes = Router::new()
        .route("/", get(properties::search).post(properties::create_property))
        .route(
            "/:id",
            get(properties::get_property).put(properties::update_property),
        );

    let booking_routes = Router::new()
        .route("/", post(bookings::create_booking))
        .route("/user/:userId", get(bookings::list_user_bookings))
        .route("/:id/status", put(bookings::update_status))
        .route("/:id/contract/agree", put(bookings::agree_contract));

    let payment_routes = Router::new()
        .route("/", get(payments::list_payments).post(payments::create_payment))
        .route("/deposit", post(payments::create_deposit))
        .route("/:id/complete", put(payments::complete_payment));

    let complaint_routes = Router::new()
        .route(
            "/",
            get(complaints::list_complaints).post(complaints::create_complaint),
        )
        .route("/:id/status", put(complaints::update_status));

    let admin_routes = Router::new()
        .route("/pending-users", get(admin::pending_users))
        .route("/all-users", get(admin::all_users))
        .route("/approve-user/:userId", put(admin::approve_user))
        .route("/reject-user/:userId", delete(admin::reject_user))
        .route("/delete-user/:userId", delete(admin::delete_user))
        .route("/pending-properties", get(admin::pending_properties))
        .route("/all-properties", get(admin::all_properties))
        .route("/approve-property/:propertyId", put(admin::approve_property))
        .route("/reject-property/:propertyId", delete(admin::reject_property))
        .route("/complaints", get(admin::complaints))
        .route("/stats", get(admin::stats));

    let user_routes = Router::new()
        .route("/profile", get(users::get_profile).put(users::update_profile))
        .route("/my-properties", get(properties::my_properties))
        .route("/profile-picture", post(users::upload_profile_picture));

    let body_limit = state.config.server.max_request_bytes;
    let uploads = ServeDir::new(state.uploads.root());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/properties", property_routes)
        .nest("/api/bookings", booking_routes)
        .nest("/api/payments", payment_routes)
        .nest("/api/complaints", complaint_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/users", user_routes)
        .nest_service("/uploads", uploads)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn route_not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Route not found" })),
    )
}
