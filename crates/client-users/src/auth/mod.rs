//! Authentication module.
//!
//! Verifies bearer JWTs issued by an external identity provider and checks
//! the caller's role before a request reaches a handler.

mod claims;
mod config;
mod error;
mod middleware;

pub use claims::{Claims, Role};
pub use config::{AuthConfig, ConfigValidationError};
pub use error::AuthError;
pub use middleware::{AuthState, CurrentUser, auth_middleware, require_role};
