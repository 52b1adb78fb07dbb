//! HTTP request handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::instrument;

use crate::auth::CurrentUser;
use crate::user::{PageRequest, UserInfo, UserListQuery};

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// List users, one page at a time.
#[instrument(skip(state, user), fields(caller = %user.id()))]
pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Response> {
    // An unreadable query string means defaults, never a 400.
    let pairs = query.map(|Query(pairs)| pairs).unwrap_or_default();
    let page = PageRequest::resolve(&UserListQuery::from_pairs(pairs), &state.pagination);
    let payload = state.users.list_users(page).await?;
    Ok(json_payload(&payload))
}

/// Get a single user.
#[instrument(skip(state, user), fields(caller = %user.id()))]
pub async fn get_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let payload = state.users.get_user(id).await?;
    Ok(json_payload(&payload))
}

/// Create a user under a client.
#[instrument(skip(state, user, headers, body), fields(caller = %user.id()))]
pub async fn create_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(client_id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let created: UserInfo = state.users.create_user(client_id, &body).await?;

    let location = user_location(state.public_url.as_deref(), &headers, created.id);
    let location = HeaderValue::from_str(&location)
        .map_err(|e| ApiError::internal(format!("invalid Location header: {}", e)))?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(created),
    ))
}

/// Update a user.
#[instrument(skip(state, user, body), fields(caller = %user.id()))]
pub async fn update_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((client_id, id)): Path<(i64, i64)>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    state.users.update_user(client_id, id, &body).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a user.
#[instrument(skip(state, user), fields(caller = %user.id()))]
pub async fn delete_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((client_id, id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    state.users.delete_user(client_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A cached JSON payload, sent as-is.
fn json_payload(payload: &str) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        payload.to_string(),
    )
        .into_response()
}

/// Absolute URL of a user resource.
///
/// Prefers the configured public URL, then the request `Host`, then the bare path.
fn user_location(public_url: Option<&str>, headers: &HeaderMap, id: i64) -> String {
    let path = format!("/api/users/{id}");
    if let Some(base) = public_url {
        return format!("{base}{path}");
    }
    match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) if !host.is_empty() => format!("http://{host}{path}"),
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_location() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_location(None, &headers, 4), "/api/users/4");

        headers.insert(header::HOST, HeaderValue::from_static("api.local:8080"));
        assert_eq!(
            user_location(None, &headers, 4),
            "http://api.local:8080/api/users/4"
        );
        assert_eq!(
            user_location(Some("https://users.example.com"), &headers, 4),
            "https://users.example.com/api/users/4"
        );
    }
}
