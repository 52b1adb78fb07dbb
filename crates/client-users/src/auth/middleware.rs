//! Authentication and role-check middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use log::{debug, warn};
use std::sync::Arc;

use super::{AuthConfig, AuthError, Claims, ConfigValidationError, Role};

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = parts.next().ok_or(AuthError::InvalidAuthHeader)?;
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }

    if parts.next().is_some() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

/// Token verification state shared across requests.
#[derive(Clone)]
pub struct AuthState {
    config: Arc<AuthConfig>,
    decoding_key: DecodingKey,
    validation: Arc<Validation>,
}

impl AuthState {
    /// Build verification state from config.
    ///
    /// Resolves `env:VAR_NAME` syntax in `jwt_secret` and fails if no usable
    /// secret is configured.
    pub fn new(config: AuthConfig) -> Result<Self, ConfigValidationError> {
        config.validate()?;
        let secret = config
            .resolve_jwt_secret()?
            .ok_or(ConfigValidationError::MissingJwtSecret)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();
        validation.required_spec_claims.insert("exp".to_string());
        if let Some(ref issuer) = config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match config.audience {
            Some(ref audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            config: Arc::new(config),
            validation: Arc::new(validation),
        })
    }

    /// Get allowed CORS origins from config.
    pub fn allowed_origins(&self) -> &[String] {
        &self.config.allowed_origins
    }

    /// Verify a JWT and return its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                warn!("JWT validation failed: {:?}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken(e.to_string()),
                }
            })?;

        Ok(token_data.claims)
    }
}

/// Authenticated caller extracted from request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// Verified token claims.
    pub claims: Claims,
}

impl CurrentUser {
    /// Get the subject.
    pub fn id(&self) -> &str {
        &self.claims.sub
    }

    /// Whether the caller holds `role`.
    pub fn has_role(&self, role: Role) -> bool {
        self.claims.has_role(role)
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingAuthHeader)
    }
}

/// Authentication middleware.
///
/// Validates the `Authorization: Bearer <token>` header and injects
/// `CurrentUser` into request extensions.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = bearer_token_from_header(header)?;
    let claims = auth.validate_token(token)?;
    debug!("Authenticated caller: {}", claims.sub);

    req.extensions_mut().insert(CurrentUser { claims });

    Ok(next.run(req).await)
}

/// Role capability check.
///
/// Must run after [`auth_middleware`]. Rejects with `403 Forbidden` unless the
/// caller holds the role given as middleware state.
pub async fn require_role(
    State(required): State<Role>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AuthError::MissingAuthHeader)?;

    if !user.has_role(required) {
        warn!("Caller {} lacks {}", user.id(), required.as_role_name());
        return Err(AuthError::InsufficientPermissions(format!(
            "{} required",
            required.as_role_name()
        )));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-secret-for-unit-tests-minimum-32-chars-long";

    fn state(issuer: Option<&str>) -> AuthState {
        AuthState::new(AuthConfig {
            jwt_secret: Some(SECRET.to_string()),
            issuer: issuer.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    fn token(secret: &str, exp_offset: i64, iss: Option<&str>) -> String {
        let claims = Claims {
            sub: "caller".to_string(),
            iss: iss.map(str::to_string),
            aud: None,
            exp: Utc::now().timestamp() + exp_offset,
            iat: Some(Utc::now().timestamp()),
            email: None,
            name: None,
            roles: vec!["ROLE_USER".to_string()],
            role: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_bearer_token_from_header_valid() {
        assert_eq!(
            bearer_token_from_header("Bearer abc.def.ghi").unwrap(),
            "abc.def.ghi"
        );
        assert_eq!(
            bearer_token_from_header("bearer   token123").unwrap(),
            "token123"
        );
        assert_eq!(
            bearer_token_from_header("   Bearer\tmixed-case ").unwrap(),
            "mixed-case"
        );
    }

    #[test]
    fn test_bearer_token_from_header_invalid() {
        let cases = [
            "",
            "Bearer",
            "Bearer ",
            "Token something",
            "Bearer token extra",
            "bear token",
        ];

        for case in cases {
            assert!(
                bearer_token_from_header(case).is_err(),
                "{case} should fail"
            );
        }
    }

    #[test]
    fn test_new_requires_secret() {
        assert!(AuthState::new(AuthConfig::default()).is_err());
    }

    #[test]
    fn test_validate_token_roundtrip() {
        let state = state(None);
        let claims = state.validate_token(&token(SECRET, 3600, None)).unwrap();
        assert_eq!(claims.sub, "caller");
        assert!(claims.has_role(Role::User));
    }

    #[test]
    fn test_expired_token() {
        let state = state(None);
        let result = state.validate_token(&token(SECRET, -3600, None));
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_wrong_secret() {
        let state = state(None);
        let other = "another-secret-that-is-also-long-enough-1234";
        let result = state.validate_token(&token(other, 3600, None));
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_issuer_is_checked_when_configured() {
        let state = state(Some("https://idp.example.com"));
        assert!(
            state
                .validate_token(&token(SECRET, 3600, Some("https://idp.example.com")))
                .is_ok()
        );
        assert!(
            state
                .validate_token(&token(SECRET, 3600, Some("https://evil.example.com")))
                .is_err()
        );
    }
}
