//! Friend request handlers.
//!
//! A friendship is a single directional row: the initiator inserts it as
//! `pending` and the recipient flips it to `accepted`. Listing and removal
//! treat the relation as undirected.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use trailmark_types::api::{FriendshipResponse, MessageResponse};
use trailmark_types::models::FriendStatus;

use crate::error::ApiError;
use crate::state::{AppState, AppStateInner};
use crate::util::UserIdQuery;

#[derive(Debug, Deserialize)]
pub struct FriendPairQuery {
    pub user_id: String,
    pub friend_id: String,
}

// ── Handlers ────────────────────────────────────────────────────────────

/// GET /friends?user_id=
pub async fn list_friends(
    State(state): State<AppState>,
    Query(q): Query<UserIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let friends = list(&state, &q.user_id).await?;
    Ok(Json(friends))
}

/// POST /friends/request?user_id=&friend_id=
pub async fn send_friend_request(
    State(state): State<AppState>,
    Query(q): Query<FriendPairQuery>,
) -> Result<impl IntoResponse, ApiError> {
    send_request(&state, &q.user_id, &q.friend_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Friend request sent")),
    ))
}

/// POST /friends/accept?user_id=&friend_id=
pub async fn accept_friend_request(
    State(state): State<AppState>,
    Query(q): Query<FriendPairQuery>,
) -> Result<impl IntoResponse, ApiError> {
    accept_request(&state, &q.user_id, &q.friend_id).await?;
    Ok(Json(MessageResponse::new("Friend request accepted")))
}

/// DELETE /friends/remove?user_id=&friend_id=
pub async fn remove_friend_handler(
    State(state): State<AppState>,
    Query(q): Query<FriendPairQuery>,
) -> Result<impl IntoResponse, ApiError> {
    remove_friend(&state, &q.user_id, &q.friend_id).await?;
    Ok(Json(MessageResponse::new("Friend removed")))
}

// ── Services ────────────────────────────────────────────────────────────

pub async fn list(
    state: &AppStateInner,
    user_id: &str,
) -> Result<Vec<FriendshipResponse>, ApiError> {
    let rows = state.db.list_friendships(user_id)?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let status: FriendStatus = row
            .status
            .parse()
            .map_err(|e: String| ApiError::Internal(anyhow::anyhow!(e)))?;
        out.push(FriendshipResponse {
            user_id: row.user_id,
            friend_id: row.friend_id,
            status,
        });
    }
    Ok(out)
}

pub async fn send_request(
    state: &AppStateInner,
    user_id: &str,
    friend_id: &str,
) -> Result<(), ApiError> {
    if user_id.trim().is_empty() || friend_id.trim().is_empty() {
        return Err(ApiError::validation("user_id and friend_id cannot be empty"));
    }
    if user_id == friend_id {
        return Err(ApiError::validation("cannot send a friend request to yourself"));
    }

    if let Some(existing) = state.db.get_friendship_between(user_id, friend_id)? {
        return match existing.status.as_str() {
            "accepted" => Err(ApiError::conflict("already friends with this user")),
            _ => Err(ApiError::conflict("friend request already pending")),
        };
    }

    state
        .db
        .insert_friendship(user_id, friend_id, &FriendStatus::Pending.to_string())?;
    Ok(())
}

/// The accepting caller is `user_id`; the pending row was created with the
/// roles reversed, and the match deliberately mirrors that.
pub async fn accept_request(
    state: &AppStateInner,
    user_id: &str,
    friend_id: &str,
) -> Result<(), ApiError> {
    let changed = state.db.accept_friendship(user_id, friend_id)?;
    if changed == 0 {
        return Err(ApiError::not_found("no pending friend request from this user"));
    }
    Ok(())
}

/// Idempotent: deletes rows in both directions.
pub async fn remove_friend(
    state: &AppStateInner,
    user_id: &str,
    friend_id: &str,
) -> Result<(), ApiError> {
    state.db.delete_friendship(user_id, friend_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::test_state;

    #[tokio::test]
    async fn request_accept_remove_lifecycle() {
        let state = test_state().await;

        send_request(&state, "u1", "u2").await.unwrap();
        let listed = list(&state, "u2").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_id, "u1");
        assert_eq!(listed[0].status, FriendStatus::Pending);

        // the recipient accepts; roles are reversed relative to the row
        accept_request(&state, "u2", "u1").await.unwrap();
        let listed = list(&state, "u1").await.unwrap();
        assert_eq!(listed[0].status, FriendStatus::Accepted);

        remove_friend(&state, "u1", "u2").await.unwrap();
        assert!(list(&state, "u1").await.unwrap().is_empty());
        assert!(list(&state, "u2").await.unwrap().is_empty());

        // removal is idempotent
        remove_friend(&state, "u1", "u2").await.unwrap();
    }

    #[tokio::test]
    async fn sender_cannot_accept_their_own_request() {
        let state = test_state().await;
        send_request(&state, "u1", "u2").await.unwrap();

        let err = accept_request(&state, "u1", "u2").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let listed = list(&state, "u1").await.unwrap();
        assert_eq!(listed[0].status, FriendStatus::Pending);
    }

    #[tokio::test]
    async fn duplicate_and_self_requests_are_rejected() {
        let state = test_state().await;

        let err = send_request(&state, "u1", "u1").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        send_request(&state, "u1", "u2").await.unwrap();
        let err = send_request(&state, "u1", "u2").await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // also rejected in the opposite direction while pending
        let err = send_request(&state, "u2", "u1").await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        accept_request(&state, "u2", "u1").await.unwrap();
        let err = send_request(&state, "u1", "u2").await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }
}
