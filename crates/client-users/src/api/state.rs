//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::AuthState;
use crate::user::{PaginationConfig, UserService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// User API service.
    pub users: Arc<UserService>,
    /// Authentication state.
    pub auth: AuthState,
    /// Pagination defaults for list requests.
    pub pagination: PaginationConfig,
    /// Externally visible base URL used for `Location` headers.
    pub public_url: Option<String>,
}

impl AppState {
    /// Create new application state.
    pub fn new(users: UserService, auth: AuthState, pagination: PaginationConfig) -> Self {
        Self {
            users: Arc::new(users),
            auth,
            pagination,
            public_url: None,
        }
    }

    /// Set the public base URL, dropping any trailing slash.
    pub fn with_public_url(mut self, public_url: Option<String>) -> Self {
        self.public_url = public_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self
    }
}
