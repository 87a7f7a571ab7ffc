//! Marketplace components.
//!
//! Every component owns a clone of the pool handed to it at construction and
//! talks to the others only through the store.

pub mod access;
pub mod admin;
pub mod bookings;
pub mod complaints;
pub mod error;
pub mod identity;
pub mod listings;
pub mod payments;

pub use access::Caller;
pub use admin::AdminService;
pub use bookings::BookingService;
pub use complaints::ComplaintService;
pub use error::{ServiceError, ServiceResult};
pub use identity::{FederatedLogin, IdentityService};
pub use listings::ListingService;
pub use payments::PaymentService;
