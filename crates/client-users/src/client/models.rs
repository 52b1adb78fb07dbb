//! Client data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Client entity from database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}
