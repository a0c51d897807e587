//! # Access control capability
//!
//! The engine consumes a [`User`] per request. Policy decisions (who is a
//! contact of what) belong to the core; the engine only asks whether a row
//! or table may be seen and silently drops what may not.

mod user;

pub use user::{ContactUser, NoAuthUser, ServiceAuthorization, User};
