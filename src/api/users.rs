//! The caller's own profile.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use super::multipart::FormData;
use crate::db::{ProfileResponse, UpdateProfileRequest};
use crate::services::Caller;
use crate::uploads::UploadCategory;
use crate::AppState;

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state.identity.get_user(&caller.id).await?;
    Ok(Json(ProfileResponse::from(user)))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = state.identity.update_profile(&caller, request).await?;
    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": ProfileResponse::from(user),
    })))
}

/// Replace the profile picture (multipart field `profilePicture`)
pub async fn upload_profile_picture(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = FormData::read(multipart).await?;
    if let Some(file) = form.unexpected_file(&["profilePicture"]) {
        return Err(ApiError::bad_request(format!("Unexpected file field: {}", file.field)));
    }
    let files = form.files("profilePicture");
    if files.is_empty() {
        return Err(ApiError::bad_request("No file uploaded"));
    }

    let reference = state
        .uploads
        .save_all(UploadCategory::Profiles, &files)
        .await?
        .pop()
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let previous = match state.identity.set_profile_picture(&caller, &reference).await {
        Ok(previous) => previous,
        Err(e) => {
            state.uploads.remove(UploadCategory::Profiles, &reference).await;
            return Err(e.into());
        }
    };
    // Federated pictures are remote URLs, not stored blobs
    if let Some(previous) = previous.filter(|p| !p.starts_with("http")) {
        state.uploads.remove(UploadCategory::Profiles, &previous).await;
    }

    Ok(Json(json!({
        "message": "Profile picture updated",
        "profilePicture": reference,
    })))
}
