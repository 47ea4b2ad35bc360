//! Database Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User model.
///
/// `thoughts` and `friends` are id lists aggregated from the `thoughts` and
/// `friendships` tables; every query producing a `User` must select them.
/// Serialized as `_id` + scalar fields + id arrays, which is the wire shape
/// every user endpoint returns.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub thoughts: Vec<Uuid>,
    pub friends: Vec<Uuid>,
}

/// Thought model.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Thought {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Owning user. Kept as a plain column (no foreign key) so the user
    /// delete cascade stays a handler-owned two-step sequence.
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
