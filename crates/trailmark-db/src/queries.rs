use crate::Database;
use crate::geo;
use crate::models::{FriendshipRow, MemoryRow, MemoryShareRow, PhotoRow, ProfileRow};
use anyhow::{Result, bail};

impl Database {
    // -- Memories --

    /// Insert a memory. `location_wkt` is the textual point form
    /// (`POINT(lng lat)`); it is converted to the stored WKB hex here.
    pub fn insert_memory(
        &self,
        id: &str,
        title: &str,
        description: Option<&str>,
        location_wkt: &str,
        created_by: &str,
        created_at: &str,
    ) -> Result<()> {
        let Some(location) = geo::wkt_to_wkb_hex(location_wkt) else {
            bail!("Invalid point geometry: {}", location_wkt);
        };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO memories (id, title, description, location, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, title, description, location, created_by, created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_memory(&self, id: &str) -> Result<Option<MemoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, location, created_by, created_at
                 FROM memories WHERE id = ?1",
            )?;
            stmt.query_row([id], map_memory_row).optional()
        })
    }

    pub fn list_memories_by_owner(&self, user_id: &str) -> Result<Vec<MemoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, location, created_by, created_at
                 FROM memories WHERE created_by = ?1
                 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_memory_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch memories for a set of ids.
    pub fn list_memories_by_ids(&self, ids: &[String]) -> Result<Vec<MemoryRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, title, description, location, created_by, created_at
                 FROM memories WHERE id IN ({})
                 ORDER BY created_at DESC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let rows = stmt
                .query_map(params.as_slice(), map_memory_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Partial update of the allow-listed memory columns.
    /// `description` distinguishes untouched (outer `None`) from cleared to
    /// NULL (`Some(None)`). Returns the number of rows changed.
    pub fn update_memory(
        &self,
        id: &str,
        title: Option<&str>,
        description: Option<Option<&str>>,
        location_wkt: Option<&str>,
    ) -> Result<usize> {
        let location = match location_wkt {
            Some(wkt) => match geo::wkt_to_wkb_hex(wkt) {
                Some(hex) => Some(hex),
                None => bail!("Invalid point geometry: {}", wkt),
            },
            None => None,
        };

        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<&dyn rusqlite::types::ToSql> = Vec::new();
        if let Some(ref t) = title {
            sets.push("title = ?");
            params.push(t);
        }
        if let Some(ref d) = description {
            sets.push("description = ?");
            params.push(d);
        }
        if let Some(ref l) = location {
            sets.push("location = ?");
            params.push(l);
        }
        if sets.is_empty() {
            return Ok(0);
        }
        params.push(&id);

        // Positional ?NNN indices must be contiguous, so build them here
        let assignments: Vec<String> = sets
            .iter()
            .enumerate()
            .map(|(i, s)| s.replace('?', &format!("?{}", i + 1)))
            .collect();
        let sql = format!(
            "UPDATE memories SET {} WHERE id = ?{}",
            assignments.join(", "),
            sets.len() + 1
        );

        self.with_conn(|conn| {
            let changed = conn.execute(&sql, params.as_slice())?;
            Ok(changed)
        })
    }

    /// Remove a memory together with its photo rows and share rows in a
    /// single transaction. Stored photo files are the caller's concern.
    pub fn delete_memory_cascade(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM photos WHERE memory_id = ?1", [id])?;
            tx.execute("DELETE FROM memory_shares WHERE memory_id = ?1", [id])?;
            tx.execute("DELETE FROM memories WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(())
        })
    }

    // -- Memory shares --

    pub fn insert_share(
        &self,
        memory_id: &str,
        shared_with: &str,
        shared_by: &str,
        shared_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO memory_shares (memory_id, shared_with, shared_by, shared_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![memory_id, shared_with, shared_by, shared_at],
            )?;
            Ok(())
        })
    }

    /// Idempotent: returns the number of rows removed (0 or 1).
    pub fn delete_share(&self, memory_id: &str, shared_with: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM memory_shares WHERE memory_id = ?1 AND shared_with = ?2",
                rusqlite::params![memory_id, shared_with],
            )?;
            Ok(n)
        })
    }

    pub fn share_exists(&self, memory_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM memory_shares WHERE memory_id = ?1 AND shared_with = ?2",
                    rusqlite::params![memory_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn list_shares(&self, memory_id: &str) -> Result<Vec<MemoryShareRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT memory_id, shared_with, shared_by, shared_at
                 FROM memory_shares WHERE memory_id = ?1",
            )?;
            let rows = stmt
                .query_map([memory_id], |row| {
                    Ok(MemoryShareRow {
                        memory_id: row.get(0)?,
                        shared_with: row.get(1)?,
                        shared_by: row.get(2)?,
                        shared_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_shared_memory_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT memory_id FROM memory_shares WHERE shared_with = ?1")?;
            let rows = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Photos --

    pub fn insert_photo(
        &self,
        id: &str,
        memory_id: &str,
        url: &str,
        uploaded_by: &str,
        uploaded_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO photos (id, memory_id, url, uploaded_by, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, memory_id, url, uploaded_by, uploaded_at],
            )?;
            Ok(())
        })
    }

    pub fn get_photo(&self, id: &str) -> Result<Option<PhotoRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, memory_id, url, uploaded_by, uploaded_at
                 FROM photos WHERE id = ?1",
            )?;
            stmt.query_row([id], map_photo_row).optional()
        })
    }

    pub fn list_photos(&self, memory_id: &str) -> Result<Vec<PhotoRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, memory_id, url, uploaded_by, uploaded_at
                 FROM photos WHERE memory_id = ?1
                 ORDER BY uploaded_at",
            )?;
            let rows = stmt
                .query_map([memory_id], map_photo_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_photo(&self, id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM photos WHERE id = ?1", [id])?;
            Ok(n)
        })
    }

    // -- Friendships --

    pub fn insert_friendship(&self, user_id: &str, friend_id: &str, status: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO friendships (user_id, friend_id, status) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, friend_id, status],
            )?;
            Ok(())
        })
    }

    /// Find the single row linking two users, regardless of direction.
    pub fn get_friendship_between(&self, a: &str, b: &str) -> Result<Option<FriendshipRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, friend_id, status FROM friendships
                 WHERE (user_id = ?1 AND friend_id = ?2)
                    OR (user_id = ?2 AND friend_id = ?1)",
            )?;
            stmt.query_row(rusqlite::params![a, b], map_friendship_row)
                .optional()
        })
    }

    /// All rows where the user appears as either party, any status.
    pub fn list_friendships(&self, user_id: &str) -> Result<Vec<FriendshipRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, friend_id, status FROM friendships
                 WHERE user_id = ?1 OR friend_id = ?1",
            )?;
            let rows = stmt
                .query_map([user_id], map_friendship_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Accept a pending request sent *to* `user_id` *by* `friend_id`.
    /// The request row was created with the roles reversed, so the match is
    /// (user_id = friend_id, friend_id = user_id). Returns rows changed.
    pub fn accept_friendship(&self, user_id: &str, friend_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE friendships SET status = 'accepted'
                 WHERE user_id = ?1 AND friend_id = ?2 AND status = 'pending'",
                rusqlite::params![friend_id, user_id],
            )?;
            Ok(n)
        })
    }

    /// Delete rows in both directions; idempotent.
    pub fn delete_friendship(&self, user_id: &str, friend_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM friendships WHERE user_id = ?1 AND friend_id = ?2",
                rusqlite::params![user_id, friend_id],
            )?;
            conn.execute(
                "DELETE FROM friendships WHERE user_id = ?1 AND friend_id = ?2",
                rusqlite::params![friend_id, user_id],
            )?;
            Ok(())
        })
    }

    // -- Profiles --

    /// Profiles are provisioned by the identity layer in deployment; this
    /// insert backs tests and seeding.
    pub fn insert_profile(&self, row: &ProfileRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, username, full_name, avatar_url, email)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![row.id, row.username, row.full_name, row.avatar_url, row.email],
            )?;
            Ok(())
        })
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, full_name, avatar_url, email
                 FROM profiles WHERE id = ?1",
            )?;
            stmt.query_row([id], map_profile_row).optional()
        })
    }

    /// Update only the provided profile fields. Returns rows changed;
    /// 0 with all fields absent means nothing was attempted.
    pub fn update_profile(
        &self,
        id: &str,
        username: Option<&str>,
        full_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<usize> {
        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<&dyn rusqlite::types::ToSql> = Vec::new();
        if let Some(ref v) = username {
            sets.push("username = ?");
            params.push(v);
        }
        if let Some(ref v) = full_name {
            sets.push("full_name = ?");
            params.push(v);
        }
        if let Some(ref v) = avatar_url {
            sets.push("avatar_url = ?");
            params.push(v);
        }
        if sets.is_empty() {
            return Ok(0);
        }
        params.push(&id);

        let assignments: Vec<String> = sets
            .iter()
            .enumerate()
            .map(|(i, s)| s.replace('?', &format!("?{}", i + 1)))
            .collect();
        let sql = format!(
            "UPDATE profiles SET {} WHERE id = ?{}",
            assignments.join(", "),
            sets.len() + 1
        );

        self.with_conn(|conn| {
            let changed = conn.execute(&sql, params.as_slice())?;
            Ok(changed)
        })
    }

    /// Case-insensitive substring filter on username when `search` is given.
    pub fn list_profiles(&self, search: Option<&str>) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let rows = match search {
                Some(term) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, username, full_name, avatar_url, email
                         FROM profiles
                         WHERE username LIKE '%' || ?1 || '%'",
                    )?;
                    stmt.query_map([term], map_profile_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, username, full_name, avatar_url, email FROM profiles",
                    )?;
                    stmt.query_map([], map_profile_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
    }
}

fn map_memory_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryRow> {
    Ok(MemoryRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        location: row.get(3)?,
        created_by: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_photo_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PhotoRow> {
    Ok(PhotoRow {
        id: row.get(0)?,
        memory_id: row.get(1)?,
        url: row.get(2)?,
        uploaded_by: row.get(3)?,
        uploaded_at: row.get(4)?,
    })
}

fn map_friendship_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FriendshipRow> {
    Ok(FriendshipRow {
        user_id: row.get(0)?,
        friend_id: row.get(1)?,
        status: row.get(2)?,
    })
}

fn map_profile_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get(0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        avatar_url: row.get(3)?,
        email: row.get(4)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
