//! User API errors.

use thiserror::Error;

use super::validate::Violation;

/// Fixed message for request bodies that cannot be read.
pub const INVALID_PAYLOAD_MESSAGE: &str = "Request body is empty or is not valid JSON";

/// Errors surfaced by [`super::UserService`].
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User {0} not found")]
    NotFound(i64),

    #[error("Client {0} not found")]
    ClientNotFound(i64),

    #[error("{}", INVALID_PAYLOAD_MESSAGE)]
    InvalidPayload,

    #[error("Validation failed with {} violation(s)", .0.len())]
    Validation(Vec<Violation>),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
