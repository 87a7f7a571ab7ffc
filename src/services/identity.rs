//! Identity and approval: registration, sign-in and the caller's own profile.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::credentials::{hash_password, verify_password, CredentialService};
use crate::db::{
    now_timestamp, AuthProvider, DbPool, Registration, RegistrationCredential, Role,
    UpdateProfileRequest, User,
};
use crate::oauth::{FederatedProfile, IdentityOracle};
use crate::validation::{
    validate_email, validate_password_strength, validate_phone, validate_required,
};

use super::access::Caller;
use super::error::{ServiceError, ServiceResult};

/// Outcome of a federated sign-in
#[derive(Debug)]
pub enum FederatedLogin {
    SignedIn { token: String, user: User },
    /// No account uses the provider's email yet; the client should register
    NewUser {
        profile: FederatedProfile,
        access_token: String,
    },
}

pub struct IdentityService {
    db: DbPool,
    tokens: CredentialService,
    oracle: Arc<dyn IdentityOracle>,
    allow_admin_registration: bool,
}

impl IdentityService {
    pub fn new(
        db: DbPool,
        tokens: CredentialService,
        oracle: Arc<dyn IdentityOracle>,
        allow_admin_registration: bool,
    ) -> Self {
        Self {
            db,
            tokens,
            oracle,
            allow_admin_registration,
        }
    }

    /// Create an account. Nobody is signed in afterwards; non-admin accounts
    /// stay unapproved until an administrator approves them.
    pub async fn register(
        &self,
        registration: Registration,
        credential: RegistrationCredential,
    ) -> ServiceResult<User> {
        let role = if registration.role.trim().is_empty() {
            Role::Tenant
        } else {
            registration
                .role
                .parse::<Role>()
                .map_err(|e| ServiceError::validation("role", e))?
        };
        if role == Role::Admin && !self.allow_admin_registration {
            return Err(ServiceError::forbidden(
                "Administrator accounts cannot be registered",
            ));
        }

        let name = registration.name.trim();
        let email = registration.email.trim();
        validate_required(name, "Name").map_err(|e| ServiceError::validation("name", e))?;
        validate_email(email).map_err(|e| ServiceError::validation("email", e))?;

        let password_hash = match &credential {
            RegistrationCredential::Password(password) => {
                validate_password_strength(password)
                    .map_err(|e| ServiceError::validation("password", e))?;
                Some(hash_password(password)?)
            }
            RegistrationCredential::Federated { .. } => None,
        };

        validate_phone(&registration.phone).map_err(|e| ServiceError::validation("phone", e))?;

        if self.find_by_email(email).await?.is_some() {
            return Err(ServiceError::Conflict("User already exists".to_string()));
        }

        let (provider, federated_id, picture) = match credential {
            RegistrationCredential::Password(_) => {
                if registration.id_proof.as_deref().map_or(true, str::is_empty) {
                    return Err(ServiceError::validation("idProof", "ID Proof is required"));
                }
                (AuthProvider::Local, None, registration.profile_picture)
            }
            RegistrationCredential::Federated {
                access_token,
                federated_id,
            } => {
                let profile = self.oracle.resolve(&access_token).await?;
                if profile.subject != federated_id {
                    return Err(ServiceError::Upstream(
                        "Google account does not match this registration".to_string(),
                    ));
                }
                if !profile.email.eq_ignore_ascii_case(email) {
                    return Err(ServiceError::Upstream(
                        "Google account email does not match this registration".to_string(),
                    ));
                }
                let picture = registration.profile_picture.or(profile.picture);
                (AuthProvider::Google, Some(federated_id), picture)
            }
        };

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, phone, address, role, id_proof,
                               id_proof_type, is_approved, google_id, profile_picture, auth_provider, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(&password_hash)
        .bind(&registration.phone)
        .bind(registration.address.trim())
        .bind(role.as_str())
        .bind(&registration.id_proof)
        .bind(&registration.id_proof_type)
        .bind(role.approved_on_creation())
        .bind(&federated_id)
        .bind(&picture)
        .bind(provider.as_str())
        .bind(now_timestamp())
        .execute(&self.db)
        .await?;

        info!(user_id = %id, role = %role, provider = provider.as_str(), "User registered");
        self.get_user(&id).await
    }

    /// Password sign-in. Unapproved non-admin accounts never get a token.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<(String, User)> {
        let user = self
            .find_by_email(email.trim())
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !user.may_sign_in() {
            return Err(ServiceError::PendingApproval);
        }

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(ServiceError::InvalidCredentials)?;
        if !verify_password(password, hash) {
            warn!(user_id = %user.id, "Failed password sign-in");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.tokens.issue_for(&user)?;
        info!(user_id = %user.id, "User signed in");
        Ok((token, user))
    }

    /// Sign in with a provider access token
    pub async fn federated_login(&self, access_token: &str) -> ServiceResult<FederatedLogin> {
        let profile = self.oracle.resolve(access_token).await?;

        let Some(user) = self.find_by_email(&profile.email).await? else {
            return Ok(FederatedLogin::NewUser {
                profile,
                access_token: access_token.to_string(),
            });
        };

        if !user.may_sign_in() {
            return Err(ServiceError::PendingApproval);
        }

        let user = if user.google_id.is_none() {
            let mut tx = self.db.begin().await?;
            sqlx::query(
                "UPDATE users SET google_id = ?, profile_picture = COALESCE(?, profile_picture) WHERE id = ? AND google_id IS NULL",
            )
            .bind(&profile.subject)
            .bind(&profile.picture)
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
            let refreshed: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
                .bind(&user.id)
                .fetch_one(&mut *tx)
                .await?;
            tx.commit().await?;
            info!(user_id = %user.id, "Linked Google account");
            refreshed
        } else {
            user
        };

        let token = self.tokens.issue_for(&user)?;
        Ok(FederatedLogin::SignedIn { token, user })
    }

    pub async fn get_user(&self, id: &str) -> ServiceResult<User> {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    pub async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    /// Update the caller's own contact fields; absent fields are kept
    pub async fn update_profile(
        &self,
        caller: &Caller,
        req: UpdateProfileRequest,
    ) -> ServiceResult<User> {
        if let Some(name) = &req.name {
            validate_required(name, "Name").map_err(|e| ServiceError::validation("name", e))?;
        }
        if let Some(phone) = &req.phone {
            validate_phone(phone).map_err(|e| ServiceError::validation("phone", e))?;
        }

        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = COALESCE(?, name),
                phone = COALESCE(?, phone),
                address = COALESCE(?, address)
            WHERE id = ?
            "#,
        )
        .bind(req.name.as_deref().map(str::trim))
        .bind(&req.phone)
        .bind(&req.address)
        .bind(&caller.id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found("User not found"));
        }
        self.get_user(&caller.id).await
    }

    /// Store a new picture reference and return the one it replaced
    pub async fn set_profile_picture(
        &self,
        caller: &Caller,
        reference: &str,
    ) -> ServiceResult<Option<String>> {
        let user = self.get_user(&caller.id).await?;
        sqlx::query("UPDATE users SET profile_picture = ? WHERE id = ?")
            .bind(reference)
            .bind(&caller.id)
            .execute(&self.db)
            .await?;
        Ok(user.profile_picture)
    }

    /// Create the configured administrator if no account uses its email.
    ///
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, email: &str, password: &str, name: &str) -> ServiceResult<bool> {
        if self.find_by_email(email).await?.is_some() {
            return Ok(false);
        }

        let hash = hash_password(password)?;
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, phone, address, role, is_approved, auth_provider, created_at)
            VALUES (?, ?, ?, ?, '', '', ?, 1, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(&hash)
        .bind(Role::Admin.as_str())
        .bind(AuthProvider::Local.as_str())
        .bind(now_timestamp())
        .execute(&self.db)
        .await?;

        info!(user_id = %id, email = %email, "Created administrator account");
        Ok(true)
    }
}
