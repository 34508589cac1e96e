//! Photo endpoints.
//!
//! Deletion rule: the parent memory's owner and the photo's uploader may
//! delete a photo. A user who merely holds a share on the memory may not
//! delete someone else's photo from it.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use trailmark_db::models::PhotoRow;
use trailmark_types::api::{
    CreatePhotoRequest, MessageResponse, PhotoResponse, PhotoUploadResponse,
};

use crate::error::ApiError;
use crate::state::{AppState, AppStateInner};
use crate::storage::BUCKET_PHOTOS;
use crate::util::{self, UserIdQuery};

#[derive(Debug, Deserialize)]
pub struct MemoryIdQuery {
    pub memory_id: String,
}

// ── Handlers ────────────────────────────────────────────────────────────

/// GET /photos?memory_id=
pub async fn list_photos(
    State(state): State<AppState>,
    Query(q): Query<MemoryIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let photos: Vec<PhotoResponse> = state
        .db
        .list_photos(&q.memory_id)?
        .into_iter()
        .map(row_to_response)
        .collect();
    Ok(Json(photos))
}

/// GET /photos/{id}
pub async fn get_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_photo(&photo_id)?
        .ok_or_else(|| ApiError::not_found("photo not found"))?;
    Ok(Json(row_to_response(row)))
}

/// POST /photos — direct record insert. Any caller with a valid memory id
/// may attach a photo; there is deliberately no ownership check here.
pub async fn create_photo(
    State(state): State<AppState>,
    Json(req): Json<CreatePhotoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = create(&state, req).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /photos/{id}/upload?user_id= (multipart) — the path id is the
/// memory the photo is attached to.
pub async fn upload_photo(
    State(state): State<AppState>,
    Path(memory_id): Path<String>,
    Query(q): Query<UserIdQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let file = util::read_file_field(&mut multipart).await?;
    let record =
        upload_to_memory(&state, &memory_id, &q.user_id, &file.filename, &file.bytes).await?;
    Ok((
        StatusCode::CREATED,
        Json(PhotoUploadResponse { url: record.url.clone(), record }),
    ))
}

/// DELETE /photos/{id}?user_id=
pub async fn delete_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<String>,
    Query(q): Query<UserIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    delete(&state, &photo_id, &q.user_id).await?;
    Ok(Json(MessageResponse::new("Photo deleted")))
}

// ── Services ────────────────────────────────────────────────────────────

pub async fn create(
    state: &AppStateInner,
    req: CreatePhotoRequest,
) -> Result<PhotoResponse, ApiError> {
    if state.db.get_memory(&req.memory_id)?.is_none() {
        return Err(ApiError::not_found("memory not found"));
    }

    let id = Uuid::new_v4().to_string();
    let uploaded_at = util::now_rfc3339();
    state
        .db
        .insert_photo(&id, &req.memory_id, &req.url, &req.uploaded_by, &uploaded_at)?;

    Ok(PhotoResponse {
        id,
        memory_id: req.memory_id,
        url: req.url,
        uploaded_by: req.uploaded_by,
        uploaded_at: util::parse_timestamp(&uploaded_at, "new photo"),
    })
}

/// Extension is validated before any storage or database call is made.
pub async fn upload_to_memory(
    state: &AppStateInner,
    memory_id: &str,
    user_id: &str,
    filename: &str,
    bytes: &[u8],
) -> Result<PhotoResponse, ApiError> {
    util::require_image_extension(filename)?;

    if state.db.get_memory(memory_id)?.is_none() {
        return Err(ApiError::not_found("memory not found"));
    }

    let url = state
        .storage
        .upload(BUCKET_PHOTOS, memory_id, filename, bytes)
        .await?;

    create(
        state,
        CreatePhotoRequest {
            memory_id: memory_id.to_string(),
            url,
            uploaded_by: user_id.to_string(),
        },
    )
    .await
}

pub async fn delete(
    state: &AppStateInner,
    photo_id: &str,
    user_id: &str,
) -> Result<(), ApiError> {
    let photo = state
        .db
        .get_photo(photo_id)?
        .ok_or_else(|| ApiError::not_found("photo not found"))?;

    let memory = state
        .db
        .get_memory(&photo.memory_id)?
        .ok_or_else(|| ApiError::not_found("memory not found"))?;

    if user_id != memory.created_by && user_id != photo.uploaded_by {
        if state.db.share_exists(&photo.memory_id, user_id)? {
            return Err(ApiError::forbidden(
                "cannot delete another user's photo from a shared memory",
            ));
        }
        return Err(ApiError::forbidden("not allowed to delete this photo"));
    }

    if let Err(e) = state.storage.delete(BUCKET_PHOTOS, &photo.url).await {
        warn!("Failed to delete stored file for photo {}: {:#}", photo_id, e);
    }
    state.db.delete_photo(photo_id)?;
    Ok(())
}

fn row_to_response(row: PhotoRow) -> PhotoResponse {
    let uploaded_at = util::parse_timestamp(&row.uploaded_at, &format!("photo {}", row.id));
    PhotoResponse {
        id: row.id,
        memory_id: row.memory_id,
        url: row.url,
        uploaded_by: row.uploaded_by,
        uploaded_at,
    }
}
