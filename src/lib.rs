pub mod api;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error_log;
pub mod oauth;
pub mod services;
pub mod uploads;
pub mod validation;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;

use crate::credentials::CredentialService;
use crate::error_log::ErrorLog;
use crate::oauth::IdentityOracle;
use crate::services::{
    AdminService, BookingService, ComplaintService, IdentityService, ListingService,
    PaymentService,
};
use crate::uploads::UploadStore;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub tokens: CredentialService,
    pub uploads: UploadStore,
    pub error_log: ErrorLog,
    pub identity: IdentityService,
    pub listings: ListingService,
    pub bookings: BookingService,
    pub payments: PaymentService,
    pub complaints: ComplaintService,
    pub admin: AdminService,
}

impl AppState {
    /// Wire every component to its own handle on the pool
    pub fn new(config: Config, db: DbPool, oracle: Arc<dyn IdentityOracle>) -> Self {
        let tokens = CredentialService::new(&config.auth.jwt_secret, config.auth.token_ttl_days);
        let identity = IdentityService::new(
            db.clone(),
            tokens.clone(),
            oracle,
            config.auth.allow_admin_registration,
        );

        Self {
            uploads: UploadStore::new(&config.uploads),
            error_log: ErrorLog::new(config.logging.error_log.clone()),
            identity,
            listings: ListingService::new(db.clone()),
            bookings: BookingService::new(db.clone()),
            payments: PaymentService::new(db.clone()),
            complaints: ComplaintService::new(db.clone()),
            admin: AdminService::new(db.clone()),
            tokens,
            config,
            db,
        }
    }
}
