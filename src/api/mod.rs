//! Bindings for the remote authentication service
pub mod auth;
pub mod response;

pub use auth::{AuthApi, Credentials, PasswordReset, Registration};
