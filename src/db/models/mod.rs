//! Database models split into domain-specific modules.

pub mod booking;
pub mod common;
pub mod complaint;
pub mod payment;
pub mod property;
pub mod stats;
pub mod user;

pub use booking::*;
pub use common::*;
pub use complaint::*;
pub use payment::*;
pub use property::*;
pub use stats::*;
pub use user::*;
