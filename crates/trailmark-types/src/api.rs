use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::FriendStatus;

// -- Memories --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMemoryRequest {
    pub title: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Partial update for a memory. Only these fields are updatable; protected
/// columns (id, created_by, created_at) are rejected by `deny_unknown_fields`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMemoryRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct MemoryShareResponse {
    pub shared_with: String,
    pub shared_by: String,
}

// -- Photos --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePhotoRequest {
    pub memory_id: String,
    pub url: String,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhotoResponse {
    pub id: String,
    pub memory_id: String,
    pub url: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PhotoUploadResponse {
    pub url: String,
    pub record: PhotoResponse,
}

// -- Friends --

#[derive(Debug, Serialize)]
pub struct FriendshipResponse {
    pub user_id: String,
    pub friend_id: String,
    pub status: FriendStatus,
}

// -- Users / profiles --

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

// -- Generic --

/// Short acknowledgement returned by mutation endpoints.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
