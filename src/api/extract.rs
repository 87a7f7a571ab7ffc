//! Request extractors resolving the caller from its identity token.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::sync::Arc;

use super::error::ApiError;
use crate::services::{Caller, ServiceError};
use crate::AppState;

/// Token from `Authorization: Bearer` or the legacy `x-access-token` header
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(auth_header) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token);
            }
        }
    }

    headers
        .get("x-access-token")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::forbidden("No token provided"))?;

        let claims = state
            .tokens
            .verify(token)
            .map_err(|e| ApiError::from(ServiceError::from(e)))?;
        Ok(Caller::from(claims))
    }
}

/// Caller for public routes; absent or unusable tokens read as anonymous
pub struct OptionalCaller(pub Option<Caller>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let caller = extract_token(&parts.headers)
            .and_then(|token| state.tokens.verify(token).ok())
            .map(Caller::from);
        Ok(OptionalCaller(caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_legacy_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-access-token", HeaderValue::from_static("legacy"));
        assert_eq!(extract_token(&headers), Some("legacy"));

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer primary"),
        );
        assert_eq!(extract_token(&headers), Some("primary"));
    }

    #[test]
    fn malformed_headers_yield_nothing() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic abc"),
        );
        assert_eq!(extract_token(&headers), None);

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer "),
        );
        assert_eq!(extract_token(&headers), None);
    }
}
