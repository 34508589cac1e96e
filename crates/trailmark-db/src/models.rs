/// Database row types — these map directly to SQLite rows.
/// Distinct from trailmark-types API models to keep the DB layer independent.

pub struct MemoryRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Hex-encoded WKB point as stored in the `location` column.
    pub location: String,
    pub created_by: String,
    pub created_at: String,
}

pub struct PhotoRow {
    pub id: String,
    pub memory_id: String,
    pub url: String,
    pub uploaded_by: String,
    pub uploaded_at: String,
}

pub struct MemoryShareRow {
    pub memory_id: String,
    pub shared_with: String,
    pub shared_by: String,
    pub shared_at: String,
}

pub struct FriendshipRow {
    pub user_id: String,
    pub friend_id: String,
    pub status: String,
}

pub struct ProfileRow {
    pub id: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
}
