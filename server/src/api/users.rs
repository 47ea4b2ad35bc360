//! Users API
//!
//! CRUD operations for users plus friend-set mutations. Each handler is a
//! single linear pass: extract parameters, run one or two repository calls,
//! serialize the result. A missing by-id target always short-circuits to a
//! 404 with a fixed message.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::api::AppState;
use crate::db::{self, Thought, User};

/// Create the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route(
            "/users/{user_id}/friends/{friend_id}",
            post(add_friend).delete(remove_friend),
        )
}

// ============================================================================
// Types
// ============================================================================

/// Request to create a user.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserBody {
    #[validate(length(min = 1, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: String,
}

/// Partial update to a user. Absent fields keep their current value.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserBody {
    #[validate(length(min = 1, max = 32))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// A user with its `thoughts` and `friends` id lists expanded into full
/// records. Friends keep their own id lists (expansion depth 1).
#[derive(Debug, Serialize)]
pub struct UserDetail {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub thoughts: Vec<Thought>,
    pub friends: Vec<User>,
}

/// Confirmation body for a completed user deletion.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

// ============================================================================
// Error Types
// ============================================================================

/// Error types for user operations.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    UserNotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl UserError {
    /// Classify a store failure during create/update as a client error.
    ///
    /// The raw driver error is logged, never serialized; the response carries
    /// a short structured detail instead.
    fn rejected(err: sqlx::Error) -> Self {
        if err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            return Self::Validation("username or email already taken".into());
        }
        tracing::error!(error = %err, "User store rejected a write");
        Self::Validation("payload rejected by the user store".into())
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> axum::response::Response {
        match self {
            // NotFound carries the fixed message only, no error detail
            Self::UserNotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "User not found" })),
            )
                .into_response(),
            Self::Validation(detail) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Validation failed", "error": detail })),
            )
                .into_response(),
            Self::Database(err) => {
                tracing::error!(error = %err, "Database error in users API");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Database error", "error": "internal database error" })),
                )
                    .into_response()
            }
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/users - List all users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, UserError> {
    let users = db::list_users(&state.db).await?;
    Ok(Json(users))
}

/// GET /api/users/{user_id} - Get a single user with thoughts and friends
/// expanded to full records
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserDetail>, UserError> {
    let user = db::find_user_by_id(&state.db, user_id)
        .await?
        .ok_or(UserError::UserNotFound)?;

    let thoughts = db::find_thoughts_by_ids(&state.db, &user.thoughts).await?;
    let friends = db::find_users_by_ids(&state.db, &user.friends).await?;

    Ok(Json(UserDetail {
        id: user.id,
        username: user.username,
        email: user.email,
        thoughts,
        friends,
    }))
}

/// POST /api/users - Create a new user
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserBody>,
) -> Result<(StatusCode, Json<User>), UserError> {
    body.validate()
        .map_err(|e| UserError::Validation(e.to_string()))?;

    let user = db::create_user(&state.db, &body.username, &body.email)
        .await
        .map_err(UserError::rejected)?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/users/{user_id} - Partially update a user
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateUserBody>,
) -> Result<Json<User>, UserError> {
    body.validate()
        .map_err(|e| UserError::Validation(e.to_string()))?;

    let user = db::update_user(
        &state.db,
        user_id,
        body.username.as_deref(),
        body.email.as_deref(),
    )
    .await
    .map_err(UserError::rejected)?
    .ok_or(UserError::UserNotFound)?;

    Ok(Json(user))
}

/// DELETE /api/users/{user_id} - Delete a user and the thoughts it owned
///
/// Two independent store calls, not atomic: a crash after the user delete
/// leaves orphaned thought rows.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, UserError> {
    let thought_ids = db::delete_user(&state.db, user_id)
        .await?
        .ok_or(UserError::UserNotFound)?;

    let removed = db::delete_thoughts_by_ids(&state.db, &thought_ids).await?;
    tracing::debug!(user_id = %user_id, thoughts_removed = removed, "User deleted");

    Ok(Json(DeleteResponse {
        message: "User and associated thoughts deleted",
    }))
}

/// POST /api/users/{user_id}/friends/{friend_id} - Add a friend
///
/// Idempotent: adding a friend that is already present changes nothing and
/// still returns the user.
pub async fn add_friend(
    State(state): State<AppState>,
    Path((user_id, friend_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<User>, UserError> {
    let user = db::add_friend(&state.db, user_id, friend_id)
        .await?
        .ok_or(UserError::UserNotFound)?;

    Ok(Json(user))
}

/// DELETE /api/users/{user_id}/friends/{friend_id} - Remove a friend
///
/// Removing an absent friend is a no-op and still returns the user.
pub async fn remove_friend(
    State(state): State<AppState>,
    Path((user_id, friend_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<User>, UserError> {
    let user = db::remove_friend(&state.db, user_id, friend_id)
        .await?
        .ok_or(UserError::UserNotFound)?;

    Ok(Json(user))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_json(resp: axum::response::Response) -> (StatusCode, serde_json::Value) {
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn not_found_is_404_with_fixed_message_and_no_error_field() {
        let (status, body) = response_json(UserError::UserNotFound.into_response()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn validation_failure_is_400_with_detail() {
        let err = UserError::Validation("email: invalid".into());
        let (status, body) = response_json(err.into_response()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["error"], "email: invalid");
    }

    #[tokio::test]
    async fn database_error_is_500_and_redacted() {
        let err = UserError::Database(sqlx::Error::PoolTimedOut);
        let (status, body) = response_json(err.into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Database error");
        // The driver error must never reach the client
        assert_eq!(body["error"], "internal database error");
    }

    #[test]
    fn unique_violation_on_write_classifies_as_client_error() {
        // RowNotFound is a stand-in for a non-constraint driver failure
        let err = UserError::rejected(sqlx::Error::RowNotFound);
        match err {
            UserError::Validation(detail) => {
                assert_eq!(detail, "payload rejected by the user store");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn user_serializes_with_mongo_style_id_and_id_arrays() {
        let user = User {
            id: Uuid::now_v7(),
            username: "ana".into(),
            email: "ana@x.com".into(),
            thoughts: vec![],
            friends: vec![],
        };
        let value = serde_json::to_value(&user).unwrap();

        assert_eq!(value["_id"], user.id.to_string());
        assert_eq!(value["username"], "ana");
        assert_eq!(value["email"], "ana@x.com");
        assert_eq!(value["thoughts"], serde_json::json!([]));
        assert_eq!(value["friends"], serde_json::json!([]));
        assert!(value.get("id").is_none(), "id must serialize as _id");
    }

    #[test]
    fn create_body_rejects_empty_username_and_bad_email() {
        let body = CreateUserBody {
            username: String::new(),
            email: "ana@x.com".into(),
        };
        assert!(body.validate().is_err());

        let body = CreateUserBody {
            username: "ana".into(),
            email: "not-an-email".into(),
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn update_body_allows_empty_patch_but_validates_present_fields() {
        let body = UpdateUserBody {
            username: None,
            email: None,
        };
        assert!(body.validate().is_ok());

        let body = UpdateUserBody {
            username: None,
            email: Some("not-an-email".into()),
        };
        assert!(body.validate().is_err());
    }
}
