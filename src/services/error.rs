//! Domain error taxonomy shared by every marketplace component.

use thiserror::Error;

use crate::credentials::CredentialError;
use crate::oauth::OracleError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account pending approval")]
    PendingApproval,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The entity exists but is in a state that does not allow the operation
    #[error("{0}")]
    InvalidState(String),

    /// The identity provider refused or could not check a token
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ServiceError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.message().contains("UNIQUE constraint failed") => {
                ServiceError::Conflict("A record with this identifier already exists".to_string())
            }
            _ => {
                tracing::error!("Database error: {}", err);
                ServiceError::Internal(err.to_string())
            }
        }
    }
}

impl From<CredentialError> for ServiceError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Expired | CredentialError::Invalid(_) => {
                ServiceError::Unauthorized("Invalid or expired token".to_string())
            }
            other => {
                tracing::error!("Credential error: {}", other);
                ServiceError::Internal(other.to_string())
            }
        }
    }
}

impl From<OracleError> for ServiceError {
    fn from(err: OracleError) -> Self {
        tracing::warn!("Identity provider check failed: {}", err);
        ServiceError::Upstream("Invalid Google Token".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_become_not_found() {
        assert!(matches!(
            ServiceError::from(sqlx::Error::RowNotFound),
            ServiceError::NotFound(_)
        ));
    }

    #[test]
    fn credential_failures_are_unauthorized() {
        assert!(matches!(
            ServiceError::from(CredentialError::Expired),
            ServiceError::Unauthorized(_)
        ));
        assert!(matches!(
            ServiceError::from(CredentialError::Hashing("boom".into())),
            ServiceError::Internal(_)
        ));
    }

    #[test]
    fn validation_displays_its_message() {
        let err = ServiceError::validation("phone", "Invalid phone number.");
        assert_eq!(err.to_string(), "Invalid phone number.");
    }
}
