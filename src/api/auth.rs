//! Registration and sign-in endpoints.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use super::error::ApiError;
use super::multipart::FormData;
use crate::db::{
    FederatedLoginRequest, LoginRequest, LoginResponse, Registration, RegistrationCredential,
    UserResponse,
};
use crate::services::FederatedLogin;
use crate::uploads::UploadCategory;
use crate::AppState;

/// Profile handed back to the client so it can finish a federated registration
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleProfileResponse {
    name: String,
    email: String,
    google_id: String,
    picture: Option<String>,
    #[serde(rename = "access_token")]
    access_token: String,
}

/// Register endpoint (multipart, optional `idProofImage` file)
pub async fn register(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = FormData::read(multipart).await?;
    if let Some(file) = form.unexpected_file(&["idProofImage"]) {
        return Err(ApiError::bad_request(format!("Unexpected file field: {}", file.field)));
    }

    let credential = match (form.text("googleToken"), form.text("googleId")) {
        (Some(access_token), Some(federated_id)) => RegistrationCredential::Federated {
            access_token,
            federated_id,
        },
        _ => {
            let password = form
                .text("password")
                .ok_or_else(|| ApiError::validation_field("password", "Password is required"))?;
            RegistrationCredential::Password(password)
        }
    };

    // Store the ID proof first so its reference can be recorded with the user
    let proof_files = form.files("idProofImage");
    let stored_proof = if proof_files.is_empty() {
        None
    } else {
        state
            .uploads
            .save_all(UploadCategory::IdProofs, &proof_files)
            .await?
            .pop()
    };

    let registration = Registration {
        name: form.raw("name"),
        email: form.raw("email"),
        phone: form.raw("phone").trim().to_string(),
        address: form.raw("address"),
        role: form.raw("role"),
        id_proof_type: form.text("idProofType"),
        id_proof: stored_proof.clone().or_else(|| form.text("idProof")),
        profile_picture: form.text("profilePicture"),
    };

    match state.identity.register(registration, credential).await {
        Ok(user) => {
            tracing::debug!(user_id = %user.id, "Registration accepted");
            Ok((
                StatusCode::CREATED,
                Json(json!({ "message": "User registered successfully" })),
            )
                .into_response())
        }
        Err(e) => {
            if let Some(reference) = stored_proof {
                state.uploads.remove(UploadCategory::IdProofs, &reference).await;
            }
            Err(e.into())
        }
    }
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (token, user) = state.identity.login(&request.email, &request.password).await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: UserResponse::from(user),
    }))
}

/// Google sign-in; unknown accounts get their profile back to register with
pub async fn google(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FederatedLoginRequest>,
) -> Result<Response, ApiError> {
    let access_token = request
        .access_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::validation_field("access_token", "Token required"))?;

    let response = match state.identity.federated_login(&access_token).await? {
        FederatedLogin::SignedIn { token, user } => Json(LoginResponse {
            message: "Login successful".to_string(),
            token,
            user: UserResponse::detailed(user),
        })
        .into_response(),
        FederatedLogin::NewUser {
            profile,
            access_token,
        } => {
            let google_profile = GoogleProfileResponse {
                name: profile.name,
                email: profile.email,
                google_id: profile.subject,
                picture: profile.picture,
                access_token,
            };
            Json(json!({
                "isNewUser": true,
                "message": "User not registered",
                "googleProfile": google_profile,
            }))
            .into_response()
        }
    };

    Ok(response)
}
