//! User data models.

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// User entity from database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub client_id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: Json<Vec<String>>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Merge an update onto this user in place.
    ///
    /// Fields present in the request overwrite, absent fields are kept. An
    /// explicit `null` for a name clears it. Returns the new plaintext
    /// password when a non-empty one was supplied; the caller hashes it.
    pub fn apply(&mut self, request: UpdateUserRequest) -> Option<String> {
        if let Some(email) = request.email {
            self.email = email;
        }
        if let Some(first_name) = request.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = request.last_name {
            self.last_name = last_name;
        }
        request.password.filter(|p| !p.is_empty())
    }
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub client_id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: Vec<String>,
}

/// Public user projection. This is the only user shape ever serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub client_id: i64,
    pub created_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            client_id: user.client_id,
            created_at: user.created_at,
        }
    }
}

/// Request body for creating a user.
///
/// Required fields are optional here so that a missing field surfaces as a
/// validation violation rather than a parse failure. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Request body for updating a user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub last_name: Option<Option<String>>,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// User list query parameters, kept raw so bad values fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl UserListQuery {
    /// Pick `page` and `limit` out of decoded query pairs. A repeated key keeps its last value.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "page" => query.page = Some(value),
                "limit" => query.limit = Some(value),
                _ => {}
            }
        }
        query
    }
}

/// Pagination settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page: u32,
    pub default_limit: u32,
    /// Upper bound on `limit`. Unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<u32>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_limit: 10,
            max_limit: None,
        }
    }
}

/// A resolved page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Resolve raw query values. Absent, non-numeric or zero values fall back
    /// to the configured defaults; `limit` is capped at `max_limit` when one is set.
    pub fn resolve(query: &UserListQuery, config: &PaginationConfig) -> Self {
        fn positive(raw: Option<&str>) -> Option<u32> {
            raw?.trim().parse::<u32>().ok().filter(|n| *n > 0)
        }

        let page = positive(query.page.as_deref()).unwrap_or(config.default_page.max(1));
        let mut limit = positive(query.limit.as_deref()).unwrap_or(config.default_limit.max(1));
        if let Some(max) = config.max_limit {
            limit = limit.min(max.max(1));
        }

        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}
