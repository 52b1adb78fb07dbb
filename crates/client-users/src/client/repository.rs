//! Client repository for database operations.

use anyhow::{Context, Result, bail};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::Client;

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    /// Create a new client repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new client.
    #[instrument(skip(self))]
    pub async fn create(&self, name: &str) -> Result<Client> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Client name cannot be empty.");
        }

        debug!("Creating client: {}", name);

        let result = sqlx::query("INSERT INTO clients (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .context("Failed to insert client")?;

        let id = result.last_insert_rowid();
        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Client not found after creation"))
    }

    /// Get a client by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT id, name, created_at FROM clients WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch client")?;

        Ok(client)
    }

    /// Check whether a client exists.
    #[instrument(skip(self))]
    pub async fn exists(&self, id: i64) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clients WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check client existence")?;

        Ok(count.0 > 0)
    }

    /// List all clients, oldest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            "SELECT id, name, created_at FROM clients ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list clients")?;

        Ok(clients)
    }
}
