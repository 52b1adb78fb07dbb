//! HTTP API module.
//!
//! REST endpoints for reading and managing users under their owning client.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
