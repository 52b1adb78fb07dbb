//! User repository for database operations.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::types::Json;
use tracing::{debug, instrument};

use super::models::{NewUser, User};

const USER_COLUMNS: &str = "id, client_id, email, password_hash, first_name, last_name, roles, created_at, updated_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new user.
    #[instrument(skip(self, user), fields(client_id = user.client_id))]
    pub async fn create(&self, user: NewUser) -> Result<User> {
        debug!("Creating user: {}", user.email);

        let result = sqlx::query(
            r#"
            INSERT INTO users (client_id, email, password_hash, first_name, last_name, roles)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.client_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(Json(&user.roles))
        .execute(&self.pool)
        .await
        .context("Failed to insert user")?;

        let id = result.last_insert_rowid();
        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after creation"))
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")?;

        Ok(user)
    }

    /// List one page of users in id order.
    #[instrument(skip(self))]
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC LIMIT ? OFFSET ?");
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;

        Ok(users)
    }

    /// Persist every mutable field of `user`. Returns `false` if the row is gone.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn update(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET client_id = ?, email = ?, password_hash = ?, first_name = ?, last_name = ?,
                updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(user.client_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .context("Failed to update user")?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a user. Returns `false` if there was no such user.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }

    /// Check whether another user already uses `email`.
    #[instrument(skip(self))]
    pub async fn is_email_taken(&self, email: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ? AND id != ?")
                .bind(email)
                .bind(exclude_id.unwrap_or(0))
                .fetch_one(&self.pool)
                .await
                .context("Failed to check email availability")?;

        Ok(count.0 > 0)
    }

    /// Count total users.
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientRepository;
    use crate::db::Database;

    async fn setup() -> (UserRepository, i64) {
        let db = Database::in_memory().await.unwrap();
        let client = ClientRepository::new(db.pool().clone())
            .create("Acme")
            .await
            .unwrap();
        (UserRepository::new(db.pool().clone()), client.id)
    }

    fn new_user(client_id: i64, email: &str) -> NewUser {
        NewUser {
            client_id,
            email: email.to_string(),
            password_hash: "hashed_password".to_string(),
            first_name: Some("Test".to_string()),
            last_name: None,
            roles: vec!["ROLE_USER".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let (repo, client_id) = setup().await;

        let user = repo.create(new_user(client_id, "test@example.com")).await.unwrap();
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.client_id, client_id);
        assert_eq!(user.first_name.as_deref(), Some("Test"));
        assert_eq!(user.roles.0, vec!["ROLE_USER".to_string()]);

        let fetched = repo.get(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
        assert_eq!(fetched.password_hash, "hashed_password");
    }

    #[tokio::test]
    async fn test_create_requires_existing_client() {
        let (repo, client_id) = setup().await;
        assert!(repo.create(new_user(client_id + 100, "x@example.com")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_user() {
        let (repo, client_id) = setup().await;
        let mut user = repo.create(new_user(client_id, "update@example.com")).await.unwrap();

        user.last_name = Some("Updated".to_string());
        user.email = "changed@example.com".to_string();
        assert!(repo.update(&user).await.unwrap());

        let fetched = repo.get(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "changed@example.com");
        assert_eq!(fetched.last_name.as_deref(), Some("Updated"));
        assert_eq!(fetched.first_name.as_deref(), Some("Test"));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let (repo, client_id) = setup().await;
        let user = repo.create(new_user(client_id, "delete@example.com")).await.unwrap();

        assert!(repo.delete(user.id).await.unwrap());
        assert!(repo.get(user.id).await.unwrap().is_none());
        assert!(!repo.delete(user.id).await.unwrap());
        assert!(!repo.update(&user).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_pages_in_id_order() {
        let (repo, client_id) = setup().await;
        for i in 0..5 {
            repo.create(new_user(client_id, &format!("user{i}@example.com")))
                .await
                .unwrap();
        }

        let first = repo.list(2, 0).await.unwrap();
        let third = repo.list(2, 4).await.unwrap();
        let beyond = repo.list(2, 10).await.unwrap();

        assert_eq!(
            first.iter().map(|u| u.email.as_str()).collect::<Vec<_>>(),
            vec!["user0@example.com", "user1@example.com"]
        );
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].email, "user4@example.com");
        assert!(beyond.is_empty());
        assert_eq!(repo.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_is_email_taken() {
        let (repo, client_id) = setup().await;
        let user = repo.create(new_user(client_id, "taken@example.com")).await.unwrap();

        assert!(repo.is_email_taken("taken@example.com", None).await.unwrap());
        assert!(!repo.is_email_taken("taken@example.com", Some(user.id)).await.unwrap());
        assert!(!repo.is_email_taken("free@example.com", None).await.unwrap());
    }
}
