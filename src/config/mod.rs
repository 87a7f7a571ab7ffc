use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Upper bound for a whole request body, multipart uploads included
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_max_request_bytes() -> usize {
    48 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign identity tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
    /// Admin account created on first start when absent
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    #[serde(default)]
    pub admin_password: Option<String>,
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
    /// Whether the public register endpoint accepts role = admin
    #[serde(default)]
    pub allow_admin_registration: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_days: default_token_ttl_days(),
            admin_email: default_admin_email(),
            admin_password: None,
            admin_name: default_admin_name(),
            allow_admin_registration: false,
        }
    }
}

fn default_jwt_secret() -> String {
    // Tokens do not survive a restart unless a secret is configured
    uuid::Uuid::new_v4().to_string()
}

fn default_token_ttl_days() -> i64 {
    7
}

fn default_admin_email() -> String {
    "admin@rentdesk.local".to_string()
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_root")]
    pub root: PathBuf,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
    #[serde(default = "default_max_property_images")]
    pub max_property_images: usize,
    #[serde(default = "default_max_property_documents")]
    pub max_property_documents: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root: default_upload_root(),
            max_file_bytes: default_max_file_bytes(),
            max_property_images: default_max_property_images(),
            max_property_documents: default_max_property_documents(),
        }
    }
}

fn default_upload_root() -> PathBuf {
    PathBuf::from("./public/uploads")
}

fn default_max_file_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_max_property_images() -> usize {
    5
}

fn default_max_property_documents() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    /// Endpoint exchanging a Google access token for the user's profile
    #[serde(default = "default_google_userinfo_url")]
    pub google_userinfo_url: String,
    #[serde(default = "default_oauth_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            google_userinfo_url: default_google_userinfo_url(),
            timeout_secs: default_oauth_timeout_secs(),
        }
    }
}

fn default_google_userinfo_url() -> String {
    "https://www.googleapis.com/oauth2/v3/userinfo".to_string()
}

fn default_oauth_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Append-only file receiving failures of the listing read paths
    #[serde(default = "default_error_log")]
    pub error_log: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            error_log: default_error_log(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_error_log() -> PathBuf {
    PathBuf::from("server_error.log")
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            uploads: UploadConfig::default(),
            oauth: OAuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.token_ttl_days, 7);
        assert_eq!(config.uploads.max_file_bytes, 5 * 1024 * 1024);
        assert_eq!(config.uploads.max_property_images, 5);
        assert_eq!(config.uploads.max_property_documents, 3);
        assert!(!config.auth.allow_admin_registration);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::from_toml(
            r#"
            [auth]
            jwt_secret = "s3cret"
            admin_password = "Adm1n!pass"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.admin_password.as_deref(), Some("Adm1n!pass"));
        assert_eq!(config.auth.admin_email, "admin@rentdesk.local");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.error_log, PathBuf::from("server_error.log"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::from_toml("[server\nport = ").is_err());
    }
}
