use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            id          TEXT PRIMARY KEY,
            username    TEXT,
            full_name   TEXT,
            avatar_url  TEXT,
            email       TEXT
        );

        CREATE TABLE IF NOT EXISTS memories (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT,
            -- hex-encoded WKB point, decoded to (lat, lng) at read time
            location    TEXT NOT NULL,
            created_by  TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_memories_created_by
            ON memories(created_by);

        CREATE TABLE IF NOT EXISTS photos (
            id          TEXT PRIMARY KEY,
            memory_id   TEXT NOT NULL REFERENCES memories(id),
            url         TEXT NOT NULL,
            uploaded_by TEXT NOT NULL,
            uploaded_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_photos_memory
            ON photos(memory_id);

        CREATE TABLE IF NOT EXISTS memory_shares (
            memory_id   TEXT NOT NULL REFERENCES memories(id),
            shared_with TEXT NOT NULL,
            shared_by   TEXT NOT NULL,
            shared_at   TEXT NOT NULL,
            PRIMARY KEY (memory_id, shared_with)
        );

        CREATE INDEX IF NOT EXISTS idx_shares_shared_with
            ON memory_shares(shared_with);

        CREATE TABLE IF NOT EXISTS friendships (
            user_id     TEXT NOT NULL,
            friend_id   TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'pending',
            PRIMARY KEY (user_id, friend_id)
        );

        CREATE INDEX IF NOT EXISTS idx_friendships_friend
            ON friendships(friend_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
