//! Test utilities and common setup.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, header};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tower::ServiceExt;

use client_users::api::{self, AppState};
use client_users::auth::{AuthConfig, AuthState, Claims};
use client_users::cache::{CacheConfig, TaggedCache};
use client_users::client::ClientRepository;
use client_users::db::Database;
use client_users::user::{PaginationConfig, UserRepository, UserService};

pub const TEST_SECRET: &str = "test-secret-for-integration-tests-minimum-32-chars";

/// A running application plus handles for checking the store directly.
pub struct TestApp {
    pub router: Router,
    pub users: UserRepository,
    pub clients: ClientRepository,
    pub cache: Arc<TaggedCache>,
    pub client_id: i64,
}

/// Create a test application with one registered client.
pub async fn test_app() -> TestApp {
    test_app_with(CacheConfig::default(), None).await
}

/// Create a test application with explicit cache settings and public URL.
pub async fn test_app_with(cache_config: CacheConfig, public_url: Option<&str>) -> TestApp {
    let db = Database::in_memory().await.unwrap();

    let auth_config = AuthConfig {
        jwt_secret: Some(TEST_SECRET.to_string()),
        ..Default::default()
    };
    let auth_state = AuthState::new(auth_config).unwrap();

    let users = UserRepository::new(db.pool().clone());
    let clients = ClientRepository::new(db.pool().clone());
    let client_id = clients.create("Acme").await.unwrap().id;

    let cache = Arc::new(TaggedCache::new());
    let service = UserService::new(users.clone(), clients.clone(), cache.clone(), cache_config);

    let state = AppState::new(service, auth_state, PaginationConfig::default())
        .with_public_url(public_url.map(str::to_string));

    TestApp {
        router: api::create_router(state),
        users,
        clients,
        cache,
        client_id,
    }
}

/// Mint an HS256 token carrying `roles`.
pub fn token_with_roles(roles: &[&str]) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: "integration-test".to_string(),
        iss: None,
        aud: None,
        exp: now + 3600,
        iat: Some(now),
        email: None,
        name: None,
        roles: roles.iter().map(|r| r.to_string()).collect(),
        role: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Token for a regular API consumer.
pub fn user_token() -> String {
    token_with_roles(&["ROLE_USER"])
}

/// Send a request through the router.
pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);

    app.router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

/// Read a response body as text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
