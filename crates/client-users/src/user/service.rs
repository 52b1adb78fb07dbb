//! User API orchestration: caching, validation and persistence.

use std::sync::Arc;

use anyhow::Context;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::auth::Role;
use crate::cache::{CacheConfig, InvalidationMode, TaggedCache};
use crate::client::ClientRepository;

use super::error::UserError;
use super::models::{CreateUserRequest, NewUser, PageRequest, UpdateUserRequest, UserInfo};
use super::password::hash_password;
use super::repository::UserRepository;
use super::validate::{Candidate, Violation, validate};

/// Tag shared by every cached user payload.
pub const USERS_CACHE_TAG: &str = "usersCache";

/// Service for user management operations.
#[derive(Debug, Clone)]
pub struct UserService {
    users: UserRepository,
    clients: ClientRepository,
    cache: Arc<TaggedCache>,
    cache_config: CacheConfig,
}

impl UserService {
    /// Create a new user service.
    pub fn new(
        users: UserRepository,
        clients: ClientRepository,
        cache: Arc<TaggedCache>,
        cache_config: CacheConfig,
    ) -> Self {
        Self {
            users,
            clients,
            cache,
            cache_config,
        }
    }

    /// The response cache backing this service.
    pub fn cache(&self) -> &Arc<TaggedCache> {
        &self.cache
    }

    /// Serialized page of user projections.
    #[instrument(skip(self))]
    pub async fn list_users(&self, page: PageRequest) -> Result<Arc<str>, UserError> {
        let key = format!("users:list:{}:{}", page.page, page.limit);
        let users = &self.users;

        self.cache
            .get_or_try_insert_with(&key, &[USERS_CACHE_TAG], self.cache_config.ttl(), move || async move {
                let infos: Vec<UserInfo> = users
                    .list(i64::from(page.limit), page.offset())
                    .await?
                    .into_iter()
                    .map(UserInfo::from)
                    .collect();
                let payload = serde_json::to_string(&infos).context("serializing user list")?;
                Ok::<_, UserError>(payload)
            })
            .await
    }

    /// Serialized projection of a single user.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i64) -> Result<Arc<str>, UserError> {
        let key = format!("users:detail:{id}");
        let users = &self.users;

        self.cache
            .get_or_try_insert_with(&key, &[USERS_CACHE_TAG], self.cache_config.ttl(), move || async move {
                let user = users.get(id).await?.ok_or(UserError::NotFound(id))?;
                let payload = serde_json::to_string(&UserInfo::from(user))
                    .context("serializing user")?;
                Ok::<_, UserError>(payload)
            })
            .await
    }

    /// Create a user under `client_id` from a raw JSON body.
    #[instrument(skip(self, body))]
    pub async fn create_user(&self, client_id: i64, body: &[u8]) -> Result<UserInfo, UserError> {
        self.invalidate(InvalidationMode::Eager);

        let request: CreateUserRequest = parse_body(body)?;
        let email = request.email.as_deref().map(str::trim);

        let mut violations = validate(&Candidate {
            email,
            password: request.password.as_deref(),
            password_required: true,
            first_name: request.first_name.as_deref(),
            last_name: request.last_name.as_deref(),
        });
        self.check_email_unique(email, None, &mut violations).await?;
        if !violations.is_empty() {
            return Err(UserError::Validation(violations));
        }

        if !self.clients.exists(client_id).await? {
            return Err(UserError::ClientNotFound(client_id));
        }

        // Presence of both was checked by validation above.
        let email = email.unwrap_or_default().to_string();
        let password_hash = hash_password(request.password.as_deref().unwrap_or_default())?;

        let user = self
            .users
            .create(NewUser {
                client_id,
                email,
                password_hash,
                first_name: request.first_name,
                last_name: request.last_name,
                roles: vec![Role::User.as_role_name().to_string()],
            })
            .await?;

        self.invalidate(InvalidationMode::AfterCommit);
        info!(user_id = user.id, client_id, "Created user");

        Ok(user.into())
    }

    /// Merge a raw JSON body onto an existing user.
    #[instrument(skip(self, body))]
    pub async fn update_user(&self, client_id: i64, id: i64, body: &[u8]) -> Result<(), UserError> {
        let mut user = self.users.get(id).await?.ok_or(UserError::NotFound(id))?;

        self.invalidate(InvalidationMode::Eager);

        let request: UpdateUserRequest = parse_body(body)?;
        let new_password = user.apply(request);
        user.email = user.email.trim().to_string();

        if !self.clients.exists(client_id).await? {
            return Err(UserError::ClientNotFound(client_id));
        }
        user.client_id = client_id;

        let mut violations = validate(&Candidate {
            email: Some(&user.email),
            password: new_password.as_deref(),
            password_required: false,
            first_name: user.first_name.as_deref(),
            last_name: user.last_name.as_deref(),
        });
        self.check_email_unique(Some(&user.email), Some(id), &mut violations)
            .await?;
        if !violations.is_empty() {
            return Err(UserError::Validation(violations));
        }

        if let Some(password) = new_password {
            user.password_hash = hash_password(&password)?;
        }

        // The row may have been deleted since it was read.
        if !self.users.update(&user).await? {
            return Err(UserError::NotFound(id));
        }

        self.invalidate(InvalidationMode::AfterCommit);
        info!(user_id = id, client_id, "Updated user");

        Ok(())
    }

    /// Delete a user.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, client_id: i64, id: i64) -> Result<(), UserError> {
        if self.users.get(id).await?.is_none() {
            return Err(UserError::NotFound(id));
        }

        self.invalidate(InvalidationMode::Eager);

        if !self.users.delete(id).await? {
            return Err(UserError::NotFound(id));
        }

        self.invalidate(InvalidationMode::AfterCommit);
        info!(user_id = id, client_id, "Deleted user");

        Ok(())
    }

    /// Drop every cached user payload if `stage` is the configured invalidation point.
    fn invalidate(&self, stage: InvalidationMode) {
        if self.cache_config.invalidation == stage {
            self.cache.invalidate_tag(USERS_CACHE_TAG);
        }
    }

    /// Adds a violation when `email` is already used by another user.
    /// Skipped when the address itself is already invalid.
    async fn check_email_unique(
        &self,
        email: Option<&str>,
        exclude_id: Option<i64>,
        violations: &mut Vec<Violation>,
    ) -> Result<(), UserError> {
        let Some(email) = email else {
            return Ok(());
        };
        if violations.iter().any(|v| v.field == "email") {
            return Ok(());
        }
        if self.users.is_email_taken(email, exclude_id).await? {
            violations.push(Violation::new("email", "This email is already used."));
        }
        Ok(())
    }
}

/// Parse a JSON request body. Empty or malformed bodies are rejected with a fixed message.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, UserError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(UserError::InvalidPayload);
    }
    serde_json::from_slice(body).map_err(|e| {
        debug!("Rejected request body: {}", e);
        UserError::InvalidPayload
    })
}
