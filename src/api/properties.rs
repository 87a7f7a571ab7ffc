//! Listing endpoints. Reads are public; writes need a landlord token.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::error::ApiError;
use super::extract::OptionalCaller;
use super::multipart::FormData;
use crate::db::{Property, PropertyDraft, PropertyStatus, PropertyType, SearchFilters, SearchQuery};
use crate::error_log::ErrorLog;
use crate::services::{Caller, ServiceError, ServiceResult};
use crate::uploads::{IncomingFile, UploadCategory, UploadStore};
use crate::AppState;

const FILE_FIELDS: &[&str] = &["images", "documents"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMutationResponse {
    pub message: String,
    pub property_id: String,
    pub property: Property,
}

/// Convert a result, appending internal failures to the durable error log
async fn logged<T>(log: &ErrorLog, route: &str, result: ServiceResult<T>) -> Result<T, ApiError> {
    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            if matches!(err, ServiceError::Internal(_)) {
                log.record(route, &err.to_string()).await;
            }
            Err(err.into())
        }
    }
}

fn draft_from_form(form: &FormData) -> Result<PropertyDraft, ApiError> {
    let property_type = form
        .text("type")
        .map(|t| {
            t.parse::<PropertyType>()
                .map_err(|e| ApiError::validation_field("type", e))
        })
        .transpose()?;
    let status = form
        .text("status")
        .map(|s| {
            s.parse::<PropertyStatus>()
                .map_err(|e| ApiError::validation_field("status", e))
        })
        .transpose()?;

    Ok(PropertyDraft {
        title: form.text("title"),
        description: form.submitted("description"),
        address: form.text("address"),
        city: form.text("city"),
        district: form.submitted("district"),
        property_type,
        bhk_type: form.submitted("bhkType"),
        bedrooms: form.integer("bedrooms")?,
        bathrooms: form.integer("bathrooms")?,
        area: form.number("area")?,
        rent_price: form.number("rentPrice")?,
        deposit_amount: form.number("depositAmount")?,
        amenities: form.json("amenities"),
        facilities: form.json("facilities"),
        rules: form.submitted("rules"),
        status,
    })
}

/// Stored image and document references for one request
struct StoredFiles {
    images: Vec<String>,
    documents: Vec<String>,
}

impl StoredFiles {
    async fn save(uploads: &UploadStore, form: &FormData) -> Result<Self, ApiError> {
        if let Some(file) = form.unexpected_file(FILE_FIELDS) {
            return Err(ApiError::bad_request(format!("Unexpected file field: {}", file.field)));
        }
        let images: Vec<IncomingFile> = form.files("images");
        let documents: Vec<IncomingFile> = form.files("documents");

        // Reject the whole request before anything is written
        for file in &images {
            uploads.validate(UploadCategory::Properties, file)?;
        }
        for file in &documents {
            uploads.validate(UploadCategory::PropertyDocuments, file)?;
        }

        let images = uploads.save_all(UploadCategory::Properties, &images).await?;
        let documents = match uploads
            .save_all(UploadCategory::PropertyDocuments, &documents)
            .await
        {
            Ok(documents) => documents,
            Err(e) => {
                for reference in &images {
                    uploads.remove(UploadCategory::Properties, reference).await;
                }
                return Err(e.into());
            }
        };
        Ok(Self { images, documents })
    }

    async fn discard(self, uploads: &UploadStore) {
        for reference in &self.images {
            uploads.remove(UploadCategory::Properties, reference).await;
        }
        for reference in &self.documents {
            uploads.remove(UploadCategory::PropertyDocuments, reference).await;
        }
    }
}

/// Public search over approved, available listings
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Property>>, ApiError> {
    let filters = SearchFilters::parse(&query)?;
    let properties = logged(
        &state.error_log,
        "GET /api/properties",
        state.listings.search(&filters).await,
    )
    .await?;
    Ok(Json(properties))
}

pub async fn get_property(
    State(state): State<Arc<AppState>>,
    OptionalCaller(caller): OptionalCaller,
    Path(id): Path<String>,
) -> Result<Json<Property>, ApiError> {
    let property = logged(
        &state.error_log,
        &format!("GET /api/properties/{}", id),
        state.listings.get(&id, caller.as_ref()).await,
    )
    .await?;
    Ok(Json(property))
}

/// Create a listing (multipart, up to 5 `images` and 3 `documents`)
pub async fn create_property(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PropertyMutationResponse>), ApiError> {
    let form = FormData::read(multipart).await?;
    let draft = draft_from_form(&form)?;
    let files = StoredFiles::save(&state.uploads, &form).await?;

    let result = state
        .listings
        .create(&caller, draft, files.images.clone(), files.documents.clone())
        .await;
    if result.is_err() {
        files.discard(&state.uploads).await;
    }
    let property = logged(&state.error_log, "POST /api/properties", result).await?;

    Ok((
        StatusCode::CREATED,
        Json(PropertyMutationResponse {
            message: "Property created successfully, pending admin approval".to_string(),
            property_id: property.id.clone(),
            property,
        }),
    ))
}

/// Partial update; uploaded images or documents replace the stored lists
pub async fn update_property(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<PropertyMutationResponse>, ApiError> {
    let form = FormData::read(multipart).await?;
    let draft = draft_from_form(&form)?;
    let files = StoredFiles::save(&state.uploads, &form).await?;

    let images = (!files.images.is_empty()).then(|| files.images.clone());
    let documents = (!files.documents.is_empty()).then(|| files.documents.clone());
    let result = state
        .listings
        .update(&caller, &id, draft, images, documents)
        .await;
    if result.is_err() {
        files.discard(&state.uploads).await;
    }
    let property = logged(&state.error_log, &format!("PUT /api/properties/{}", id), result).await?;

    Ok(Json(PropertyMutationResponse {
        message: "Property updated successfully".to_string(),
        property_id: property.id.clone(),
        property,
    }))
}

/// The calling landlord's own listings, documents included
pub async fn my_properties(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<Property>>, ApiError> {
    let result = state
        .listings
        .list_for_landlord(&caller)
        .await
        .map_err(|e| match e {
            ServiceError::Forbidden(_) => ServiceError::forbidden("Only landlords can view properties"),
            other => other,
        });
    let properties = logged(&state.error_log, "GET /api/users/my-properties", result).await?;
    Ok(Json(properties))
}
