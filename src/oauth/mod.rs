//! Federated identity lookups.
//!
//! An [`IdentityOracle`] turns a provider access token into a verified
//! profile. The production implementation asks Google's userinfo endpoint;
//! [`StaticOracle`] answers from a fixed table for local runs and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::OAuthConfig;

/// Verified identity returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedProfile {
    /// Provider subject id
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Identity provider rejected the token")]
    Rejected,

    #[error("Identity provider request failed: {0}")]
    Transport(String),

    #[error("Identity provider returned an unexpected profile: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait IdentityOracle: Send + Sync {
    /// Exchange an access token for the profile it was issued to
    async fn resolve(&self, access_token: &str) -> Result<FederatedProfile, OracleError>;
}

/// Google OAuth2 userinfo client
pub struct GoogleUserInfo {
    client: reqwest::Client,
    url: String,
}

impl GoogleUserInfo {
    pub fn new(config: &OAuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!("rentdesk/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: config.google_userinfo_url.clone(),
        }
    }
}

#[derive(Deserialize)]
struct GoogleUser {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[async_trait]
impl IdentityOracle for GoogleUserInfo {
    async fn resolve(&self, access_token: &str) -> Result<FederatedProfile, OracleError> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "Google userinfo rejected token");
            return Err(OracleError::Rejected);
        }

        let user: GoogleUser = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;

        let email = user
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| OracleError::Malformed("profile has no email".to_string()))?;

        Ok(FederatedProfile {
            name: user.name.unwrap_or_else(|| email.clone()),
            subject: user.sub,
            email,
            picture: user.picture,
        })
    }
}

/// Oracle backed by a fixed token table
#[derive(Debug, Default, Clone)]
pub struct StaticOracle {
    profiles: HashMap<String, FederatedProfile>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, access_token: impl Into<String>, profile: FederatedProfile) -> Self {
        self.profiles.insert(access_token.into(), profile);
        self
    }
}

#[async_trait]
impl IdentityOracle for StaticOracle {
    async fn resolve(&self, access_token: &str) -> Result<FederatedProfile, OracleError> {
        self.profiles
            .get(access_token)
            .cloned()
            .ok_or(OracleError::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> FederatedProfile {
        FederatedProfile {
            subject: "g-123".into(),
            email: "hari@example.com".into(),
            name: "Hari".into(),
            picture: None,
        }
    }

    #[tokio::test]
    async fn static_oracle_resolves_known_tokens_only() {
        let oracle = StaticOracle::new().with_profile("good-token", profile());

        assert_eq!(oracle.resolve("good-token").await.unwrap(), profile());
        assert!(matches!(
            oracle.resolve("bad-token").await,
            Err(OracleError::Rejected)
        ));
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_transport_error() {
        let oracle = GoogleUserInfo::new(&OAuthConfig {
            google_userinfo_url: "http://127.0.0.1:9/userinfo".to_string(),
            timeout_secs: 2,
        });

        assert!(matches!(
            oracle.resolve("token").await,
            Err(OracleError::Transport(_))
        ));
    }
}
