//! Database Queries
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).
//!
//! All query functions include error context logging to aid debugging.

use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::models::{Thought, User};

/// Log and return a database error with context.
///
/// This helper ensures all database errors are logged with relevant context
/// before being propagated, making production debugging easier.
macro_rules! db_error {
    ($query:expr) => {
        |e| {
            error!(query = $query, error = %e, "Database query failed");
            e
        }
    };
    ($query:expr, $($field:tt)+) => {
        |e| {
            error!(query = $query, $($field)+, error = %e, "Database query failed");
            e
        }
    };
}

/// Shared SELECT producing a [`User`] row: the user columns plus the
/// aggregated `thoughts` and `friends` id arrays.
const USER_SELECT: &str = r"
    SELECT u.id, u.username, u.email,
           COALESCE(t.ids, ARRAY[]::uuid[]) AS thoughts,
           COALESCE(f.ids, ARRAY[]::uuid[]) AS friends
      FROM users u
      LEFT JOIN (SELECT user_id, array_agg(id ORDER BY created_at) AS ids
                   FROM thoughts GROUP BY user_id) t ON t.user_id = u.id
      LEFT JOIN (SELECT user_id, array_agg(friend_id ORDER BY created_at) AS ids
                   FROM friendships GROUP BY user_id) f ON f.user_id = u.id";

// ============================================================================
// User Queries
// ============================================================================

/// List all users, ordered by username.
pub async fn list_users(pool: &PgPool) -> sqlx::Result<Vec<User>> {
    sqlx::query_as::<_, User>(&format!("{USER_SELECT} ORDER BY u.username ASC"))
        .fetch_all(pool)
        .await
        .map_err(db_error!("list_users"))
}

/// Find user by ID.
pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE u.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_user_by_id", user_id = %id))
}

/// Find multiple users by IDs (bulk lookup to avoid N+1 queries).
pub async fn find_users_by_ids(pool: &PgPool, ids: &[Uuid]) -> sqlx::Result<Vec<User>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, User>(&format!(
        "{USER_SELECT} WHERE u.id = ANY($1) ORDER BY u.username ASC"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
    .map_err(db_error!("find_users_by_ids"))
}

/// Check if a user exists.
pub async fn user_exists(pool: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let result: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(db_error!("user_exists", user_id = %id))?;
    Ok(result.0)
}

/// Create a new user. The fresh user has no thoughts and no friends.
pub async fn create_user(pool: &PgPool, username: &str, email: &str) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        r"INSERT INTO users (id, username, email)
           VALUES ($1, $2, $3)
           RETURNING id, username, email,
                     ARRAY[]::uuid[] AS thoughts, ARRAY[]::uuid[] AS friends",
    )
    .bind(Uuid::now_v7())
    .bind(username)
    .bind(email)
    .fetch_one(pool)
    .await
    .map_err(db_error!("create_user", username = %username))
}

/// Partially update a user by ID and return the updated row.
///
/// `None` fields keep their current value. Returns `Ok(None)` when no user
/// has the given id.
pub async fn update_user(
    pool: &PgPool,
    id: Uuid,
    username: Option<&str>,
    email: Option<&str>,
) -> sqlx::Result<Option<User>> {
    let updated = sqlx::query_scalar::<_, Uuid>(
        r"UPDATE users
             SET username = COALESCE($2, username),
                 email = COALESCE($3, email),
                 updated_at = NOW()
           WHERE id = $1
           RETURNING id",
    )
    .bind(id)
    .bind(username)
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(db_error!("update_user", user_id = %id))?;

    match updated {
        Some(id) => find_user_by_id(pool, id).await,
        None => Ok(None),
    }
}

/// Delete a user by ID.
///
/// Returns the ids of the thoughts the user owned at deletion time, so the
/// caller can run the (non-atomic) thought cleanup, or `Ok(None)` when no
/// user has the given id. Friendship rows go with the user via FK cascade.
pub async fn delete_user(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<Vec<Uuid>>> {
    let deleted = sqlx::query_as::<_, (Uuid, Vec<Uuid>)>(
        r"WITH deleted AS (DELETE FROM users WHERE id = $1 RETURNING id)
          SELECT d.id, COALESCE(array_agg(t.id) FILTER (WHERE t.id IS NOT NULL),
                                ARRAY[]::uuid[]) AS thoughts
            FROM deleted d
            LEFT JOIN thoughts t ON t.user_id = d.id
           GROUP BY d.id",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(db_error!("delete_user", user_id = %id))?;

    Ok(deleted.map(|(_, thoughts)| thoughts))
}

// ============================================================================
// Friendship Queries
// ============================================================================

/// Add `friend_id` to a user's friend set and return the updated user.
///
/// Set semantics: adding an existing friend is a no-op (`ON CONFLICT DO
/// NOTHING` against the composite primary key). Returns `Ok(None)` when the
/// user does not exist; a nonexistent `friend_id` surfaces as an FK error.
pub async fn add_friend(pool: &PgPool, user_id: Uuid, friend_id: Uuid) -> sqlx::Result<Option<User>> {
    if !user_exists(pool, user_id).await? {
        return Ok(None);
    }

    sqlx::query(
        r"INSERT INTO friendships (user_id, friend_id)
           VALUES ($1, $2)
           ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(friend_id)
    .execute(pool)
    .await
    .map_err(db_error!("add_friend", user_id = %user_id, friend_id = %friend_id))?;

    find_user_by_id(pool, user_id).await
}

/// Remove `friend_id` from a user's friend set and return the updated user.
///
/// Removing an absent friend is a no-op. Returns `Ok(None)` when the user
/// does not exist.
pub async fn remove_friend(
    pool: &PgPool,
    user_id: Uuid,
    friend_id: Uuid,
) -> sqlx::Result<Option<User>> {
    if !user_exists(pool, user_id).await? {
        return Ok(None);
    }

    sqlx::query("DELETE FROM friendships WHERE user_id = $1 AND friend_id = $2")
        .bind(user_id)
        .bind(friend_id)
        .execute(pool)
        .await
        .map_err(db_error!("remove_friend", user_id = %user_id, friend_id = %friend_id))?;

    find_user_by_id(pool, user_id).await
}

// ============================================================================
// Thought Queries
// ============================================================================

/// Find multiple thoughts by IDs, oldest first.
pub async fn find_thoughts_by_ids(pool: &PgPool, ids: &[Uuid]) -> sqlx::Result<Vec<Thought>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Thought>(
        r"SELECT id, user_id, content, created_at
            FROM thoughts
           WHERE id = ANY($1)
           ORDER BY created_at ASC",
    )
    .bind(ids)
    .fetch_all(pool)
    .await
    .map_err(db_error!("find_thoughts_by_ids"))
}

/// Bulk-delete thoughts by id set. Returns the number of rows deleted.
pub async fn delete_thoughts_by_ids(pool: &PgPool, ids: &[Uuid]) -> sqlx::Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query("DELETE FROM thoughts WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await
        .map_err(db_error!("delete_thoughts_by_ids"))?;

    Ok(result.rows_affected())
}
