//! Signed identity tokens and password hashing.
//!
//! Tokens are HS256 JWTs carrying `{id, email, role}`; passwords are stored as
//! Argon2 PHC strings.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rand::Rng;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Role, User};

/// Errors produced while issuing or checking credentials
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Failed to hash password: {0}")]
    Hashing(String),
}

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies identity tokens with a server-side secret
#[derive(Clone)]
pub struct CredentialService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl CredentialService {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
        }
    }

    /// Issue a token for a stored user
    pub fn issue_for(&self, user: &User) -> Result<String, CredentialError> {
        self.issue(&user.id, &user.email, user.role_enum())
    }

    pub fn issue(&self, id: &str, email: &str, role: Role) -> Result<String, CredentialError> {
        let now = Utc::now();
        let claims = Claims {
            id: id.to_string(),
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, CredentialError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| CredentialError::Signing(e.to_string()))
    }

    /// Check signature and expiry and return the embedded identity
    pub fn verify(&self, token: &str) -> Result<Claims, CredentialError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => CredentialError::Expired,
                _ => CredentialError::Invalid(e.to_string()),
            })
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| CredentialError::Hashing(e.to_string()))?;
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CredentialError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
