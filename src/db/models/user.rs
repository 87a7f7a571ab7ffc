//! User and credential models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Marketplace roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Browses listings, books, pays and files complaints
    Tenant,
    /// Lists properties and decides on bookings
    Landlord,
    /// Approves users and listings
    Admin,
}

impl Role {
    /// Admins are approved on creation, everyone else waits for an admin
    pub fn approved_on_creation(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tenant => "tenant",
            Role::Landlord => "landlord",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tenant" => Ok(Role::Tenant),
            "landlord" => Ok(Role::Landlord),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// How the account authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Local,
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Google => "google",
        }
    }
}

impl From<String> for AuthProvider {
    fn from(s: String) -> Self {
        match s.as_str() {
            "google" => AuthProvider::Google,
            _ => AuthProvider::Local,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub phone: String,
    pub address: String,
    pub role: String,
    pub id_proof: Option<String>,
    pub id_proof_type: Option<String>,
    pub is_approved: bool,
    pub google_id: Option<String>,
    pub profile_picture: Option<String>,
    pub auth_provider: String,
    pub created_at: String,
}

impl User {
    /// Parsed role; rows are only ever written with a valid role
    pub fn role_enum(&self) -> Role {
        self.role.parse().unwrap_or(Role::Tenant)
    }

    /// Whether the approval gate lets this account obtain a token
    pub fn may_sign_in(&self) -> bool {
        self.is_approved || self.role_enum() == Role::Admin
    }
}

/// Minimal identity returned with a freshly issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_provider: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            phone: None,
            address: None,
            profile_picture: None,
            auth_provider: None,
        }
    }
}

impl UserResponse {
    /// Identity plus the contact fields shown after a federated sign-in
    pub fn detailed(user: User) -> Self {
        Self {
            phone: Some(user.phone.clone()),
            address: Some(user.address.clone()),
            profile_picture: user.profile_picture.clone(),
            auth_provider: Some(user.auth_provider.clone()),
            ..Self::from(user)
        }
    }
}

/// Full account record as seen by administrators (never carries the hash)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub role: String,
    pub id_proof: Option<String>,
    pub id_proof_type: Option<String>,
    pub is_approved: bool,
    pub google_id: Option<String>,
    pub profile_picture: Option<String>,
    pub auth_provider: String,
    pub created_at: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            address: user.address,
            role: user.role,
            id_proof: user.id_proof,
            id_proof_type: user.id_proof_type,
            is_approved: user.is_approved,
            google_id: user.google_id,
            profile_picture: user.profile_picture,
            auth_provider: user.auth_provider,
            created_at: user.created_at,
        }
    }
}

/// The caller's own profile
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub role: String,
    pub profile_picture: Option<String>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            address: user.address,
            role: user.role,
            profile_picture: user.profile_picture,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Registration fields, shared by the local and federated paths
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub role: String,
    pub id_proof_type: Option<String>,
    /// Stored blob reference, or a reference supplied as a plain field
    pub id_proof: Option<String>,
    pub profile_picture: Option<String>,
}

/// The secret half of a registration
#[derive(Debug, Clone)]
pub enum RegistrationCredential {
    Password(String),
    Federated {
        access_token: String,
        federated_id: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct FederatedLoginRequest {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("Landlord".parse::<Role>().unwrap(), Role::Landlord);
        assert_eq!(" tenant ".parse::<Role>().unwrap(), Role::Tenant);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn only_admins_are_approved_on_creation() {
        assert!(Role::Admin.approved_on_creation());
        assert!(!Role::Tenant.approved_on_creation());
        assert!(!Role::Landlord.approved_on_creation());
    }

    #[test]
    fn user_response_serializes_camel_case_and_skips_empty_fields() {
        let response = UserResponse {
            id: "u1".into(),
            name: "Sita".into(),
            email: "sita@example.com".into(),
            role: "tenant".into(),
            phone: None,
            address: None,
            profile_picture: Some("p.png".into()),
            auth_provider: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["profilePicture"], "p.png");
        assert!(json.get("phone").is_none());
    }
}
