//! User listing and profile handlers.

use axum::Json;
use axum::extract::{Multipart, Query, State};
use axum::response::IntoResponse;
use bytes::Bytes;
use serde::Deserialize;

use trailmark_db::models::ProfileRow;
use trailmark_types::api::{
    MessageResponse, ProfileResponse, UpdateProfileRequest, UserResponse,
};

use crate::error::ApiError;
use crate::state::{AppState, AppStateInner};
use crate::storage::BUCKET_AVATARS;
use crate::util::{self, UserIdQuery};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub search: Option<String>,
    pub current_user: Option<String>,
}

// ── Handlers ────────────────────────────────────────────────────────────

/// GET /users?search=&current_user=
pub async fn list_users(
    State(state): State<AppState>,
    Query(q): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let users = list(&state, q.search.as_deref(), q.current_user.as_deref()).await?;
    Ok(Json(users))
}

/// GET /profile?user_id=
pub async fn get_profile(
    State(state): State<AppState>,
    Query(q): Query<UserIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = profile(&state, &q.user_id).await?;
    Ok(Json(profile))
}

/// PUT /profile?user_id=
pub async fn update_profile(
    State(state): State<AppState>,
    Query(q): Query<UserIdQuery>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    update(&state, &q.user_id, req).await?;
    Ok(Json(MessageResponse::new("Profile updated")))
}

/// POST /profile/avatar — multipart with a `user_id` text part and a
/// `file` part.
pub async fn upload_avatar_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut user_id: Option<String> = None;
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("user_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("failed to read user_id: {e}")))?;
                user_id = Some(value);
            }
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::validation("file part is missing a filename"))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("failed to read file part: {e}")))?;
                file = Some((filename, bytes));
            }
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| ApiError::validation("missing user_id part"))?;
    let (filename, bytes) = file.ok_or_else(|| ApiError::validation("missing file part"))?;

    let profile = upload_avatar(&state, &user_id, &filename, &bytes).await?;
    Ok(Json(profile))
}

// ── Services ────────────────────────────────────────────────────────────

pub async fn list(
    state: &AppStateInner,
    search: Option<&str>,
    current_user: Option<&str>,
) -> Result<Vec<UserResponse>, ApiError> {
    let rows = state.db.list_profiles(search)?;
    let users = rows
        .into_iter()
        .filter(|row| current_user != Some(row.id.as_str()))
        .map(|row| UserResponse {
            id: row.id,
            email: row.email,
            username: row.username,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
        })
        .collect();
    Ok(users)
}

pub async fn profile(state: &AppStateInner, user_id: &str) -> Result<ProfileResponse, ApiError> {
    let row = state
        .db
        .get_profile(user_id)?
        .ok_or_else(|| ApiError::not_found("profile not found"))?;
    Ok(row_to_response(row))
}

pub async fn update(
    state: &AppStateInner,
    user_id: &str,
    req: UpdateProfileRequest,
) -> Result<(), ApiError> {
    if req.username.is_none() && req.full_name.is_none() && req.avatar_url.is_none() {
        return Err(ApiError::validation("no fields to update"));
    }

    let changed = state.db.update_profile(
        user_id,
        req.username.as_deref(),
        req.full_name.as_deref(),
        req.avatar_url.as_deref(),
    )?;
    if changed == 0 {
        return Err(ApiError::not_found("profile not found"));
    }
    Ok(())
}

/// Uploads under a randomized `{user_id}/{token}.{ext}` key — the same key
/// policy as memory photos — then points the profile at the new URL and
/// returns the refreshed profile.
pub async fn upload_avatar(
    state: &AppStateInner,
    user_id: &str,
    filename: &str,
    bytes: &[u8],
) -> Result<ProfileResponse, ApiError> {
    util::require_image_extension(filename)?;

    if state.db.get_profile(user_id)?.is_none() {
        return Err(ApiError::not_found("profile not found"));
    }

    let url = state
        .storage
        .upload(BUCKET_AVATARS, user_id, filename, bytes)
        .await?;

    state.db.update_profile(user_id, None, None, Some(&url))?;
    profile(state, user_id).await
}

fn row_to_response(row: ProfileRow) -> ProfileResponse {
    ProfileResponse {
        id: row.id,
        username: row.username,
        full_name: row.full_name,
        avatar_url: row.avatar_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::test_state;

    fn seed_profile(state: &AppStateInner, id: &str, username: Option<&str>) {
        state
            .db
            .insert_profile(&ProfileRow {
                id: id.to_string(),
                username: username.map(str::to_string),
                full_name: None,
                avatar_url: None,
                email: Some(format!("{id}@example.com")),
            })
            .unwrap();
    }

    #[tokio::test]
    async fn listing_filters_and_excludes_current_user() {
        let state = test_state().await;
        seed_profile(&state, "u1", Some("Wanderer"));
        seed_profile(&state, "u2", Some("wandering_w"));
        seed_profile(&state, "u3", Some("homebody"));

        let all = list(&state, None, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].email.is_some());

        let hits = list(&state, Some("wander"), Some("u1")).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u2"]);
    }

    #[tokio::test]
    async fn profile_lookup_and_update() {
        let state = test_state().await;
        seed_profile(&state, "u1", None);

        let err = profile(&state, "missing").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = update(&state, "u1", UpdateProfileRequest::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let req = UpdateProfileRequest {
            username: Some("wanderer".to_string()),
            ..Default::default()
        };
        update(&state, "u1", req).await.unwrap();
        let fetched = profile(&state, "u1").await.unwrap();
        assert_eq!(fetched.username.as_deref(), Some("wanderer"));

        let req = UpdateProfileRequest {
            username: Some("x".to_string()),
            ..Default::default()
        };
        let err = update(&state, "missing", req).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn avatar_upload_updates_profile_url() {
        let state = test_state().await;
        seed_profile(&state, "u1", None);

        let err = upload_avatar(&state, "u1", "me.gif", b"gif89a").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let profile = upload_avatar(&state, "u1", "me.png", b"face").await.unwrap();
        let url = profile.avatar_url.expect("avatar url set");
        assert!(url.contains("/storage/avatars/u1/"));
        assert!(url.ends_with(".png"));

        // uploading again produces a fresh randomized key
        let profile = upload_avatar(&state, "u1", "me.png", b"face2").await.unwrap();
        assert_ne!(profile.avatar_url.unwrap(), url);
    }

    #[tokio::test]
    async fn avatar_upload_requires_profile() {
        let state = test_state().await;
        let err = upload_avatar(&state, "missing", "me.png", b"face").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
