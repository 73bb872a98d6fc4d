//! SQLite persistence layer for the workspace

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::types::{Role, Sender};

/// A workspace member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl User {
    /// Whether the user has been seen within the given presence window
    pub fn online_within(&self, window_secs: i64) -> bool {
        (Utc::now() - self.last_seen_at).num_seconds() <= window_secs
    }
}

/// A collaboration room: an ordered message log plus one mutable summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub project_summary: Option<String>,
    pub memory_summary: Option<String>,
    /// Bumped on every summary write; optimistic-concurrency hook for callers
    pub summary_version: i64,
    pub created_at: DateTime<Utc>,
}

/// One message in a room's log. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub sender: Sender,
    pub sender_name: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One-line activity feed entry, one per user action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Long-term note owned by an agent, supplementary to recent messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub agent: String,
    pub room_id: Option<String>,
    pub content: String,
    pub importance: f64,
    pub created_at: DateTime<Utc>,
}

/// A delivered outreach message awaiting the recipient's attention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// SQLite database wrapper (thread-safe via Arc<Mutex>)
pub struct WorkspaceDb {
    conn: Arc<Mutex<Connection>>,
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|poisoned| {
        warn!("Workspace database mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

fn parse_ts(s: String) -> DateTime<Utc> {
    s.parse().unwrap_or_else(|_| Utc::now())
}

impl WorkspaceDb {
    /// Initialize the database with schema
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn =
            Connection::open(path.as_ref()).context("Failed to open workspace database")?;

        info!("Initializing workspace database at {:?}", path.as_ref());

        conn.execute("PRAGMA foreign_keys = ON", [])?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                last_seen_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS rooms (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                name TEXT NOT NULL,
                project_summary TEXT,
                memory_summary TEXT,
                summary_version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                room_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                sender_name TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(room_id) REFERENCES rooms(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS activities (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                user_name TEXT NOT NULL,
                summary TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS memory_records (
                id TEXT PRIMARY KEY,
                agent TEXT NOT NULL,
                room_id TEXT,
                content TEXT NOT NULL,
                importance REAL NOT NULL DEFAULT 0.1,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                message TEXT NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_users_org ON users(org_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_rooms_org ON rooms(org_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_room_created ON messages(room_id, created_at)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_activities_created ON activities(created_at)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_memory_agent ON memory_records(agent)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id)",
            [],
        )?;

        debug!("Workspace schema initialized successfully");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ── Users ──

    pub async fn create_user(&self, org_id: &str, name: &str, email: &str) -> Result<User> {
        let conn = Arc::clone(&self.conn);
        let org_id = org_id.to_owned();
        let name = name.to_owned();
        let email = email.to_owned();

        tokio::task::spawn_blocking(move || {
            let id = Uuid::new_v4().to_string();
            let now = Utc::now();
            let conn = lock(&conn);

            conn.execute(
                "INSERT INTO users (id, org_id, name, email, created_at, last_seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![&id, &org_id, &name, &email, now.to_rfc3339(), now.to_rfc3339()],
            )?;

            debug!("Created user {} ({})", name, id);
            Ok(User {
                id,
                org_id,
                name,
                email,
                created_at: now,
                last_seen_at: now,
            })
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = Arc::clone(&self.conn);
        let id = id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let user = conn
                .query_row(
                    "SELECT id, org_id, name, email, created_at, last_seen_at
                     FROM users WHERE id = ?1",
                    params![&id],
                    Self::row_to_user,
                )
                .optional()?;
            Ok(user)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Find a user by display name within one organization (case-insensitive
    /// exact match)
    pub async fn find_user_by_name(&self, org_id: &str, name: &str) -> Result<Option<User>> {
        let conn = Arc::clone(&self.conn);
        let org_id = org_id.to_owned();
        let name = name.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let user = conn
                .query_row(
                    "SELECT id, org_id, name, email, created_at, last_seen_at
                     FROM users WHERE org_id = ?1 AND LOWER(name) = LOWER(?2)",
                    params![&org_id, &name],
                    Self::row_to_user,
                )
                .optional()?;
            Ok(user)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Refresh the user's presence stamp
    pub async fn touch_seen(&self, user_id: &str) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        let user_id = user_id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            conn.execute(
                "UPDATE users SET last_seen_at = ?1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), &user_id],
            )?;
            Ok(())
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    pub async fn list_members(&self, org_id: &str) -> Result<Vec<User>> {
        let conn = Arc::clone(&self.conn);
        let org_id = org_id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let mut stmt = conn.prepare(
                "SELECT id, org_id, name, email, created_at, last_seen_at
                 FROM users WHERE org_id = ?1 ORDER BY name ASC",
            )?;
            let users = stmt
                .query_map(params![&org_id], Self::row_to_user)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(users)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            org_id: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            created_at: parse_ts(row.get(4)?),
            last_seen_at: parse_ts(row.get(5)?),
        })
    }

    // ── Rooms ──

    pub async fn create_room(&self, org_id: &str, name: &str) -> Result<Room> {
        let conn = Arc::clone(&self.conn);
        let org_id = org_id.to_owned();
        let name = name.to_owned();

        tokio::task::spawn_blocking(move || {
            let id = Uuid::new_v4().to_string();
            let now = Utc::now();
            let conn = lock(&conn);

            conn.execute(
                "INSERT INTO rooms (id, org_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![&id, &org_id, &name, now.to_rfc3339()],
            )?;

            debug!("Created room {} ({})", name, id);
            Ok(Room {
                id,
                org_id,
                name,
                project_summary: None,
                memory_summary: None,
                summary_version: 0,
                created_at: now,
            })
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    pub async fn get_room(&self, id: &str) -> Result<Option<Room>> {
        let conn = Arc::clone(&self.conn);
        let id = id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let room = conn
                .query_row(
                    "SELECT id, org_id, name, project_summary, memory_summary,
                            summary_version, created_at
                     FROM rooms WHERE id = ?1",
                    params![&id],
                    Self::row_to_room,
                )
                .optional()?;
            Ok(room)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    pub async fn list_rooms(&self, org_id: &str) -> Result<Vec<Room>> {
        let conn = Arc::clone(&self.conn);
        let org_id = org_id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let mut stmt = conn.prepare(
                "SELECT id, org_id, name, project_summary, memory_summary,
                        summary_version, created_at
                 FROM rooms WHERE org_id = ?1 ORDER BY created_at ASC",
            )?;
            let rooms = stmt
                .query_map(params![&org_id], Self::row_to_room)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rooms)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Overwrite both summary fields in one statement and bump the version
    /// counter. Last write wins. Returns the new version.
    pub async fn update_summary(&self, room_id: &str, summary: &str) -> Result<i64> {
        let conn = Arc::clone(&self.conn);
        let room_id = room_id.to_owned();
        let summary = summary.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let changed = conn.execute(
                "UPDATE rooms
                 SET project_summary = ?1, memory_summary = ?1,
                     summary_version = summary_version + 1
                 WHERE id = ?2",
                params![&summary, &room_id],
            )?;
            if changed == 0 {
                anyhow::bail!("No room with id {}", room_id);
            }
            let version: i64 = conn.query_row(
                "SELECT summary_version FROM rooms WHERE id = ?1",
                params![&room_id],
                |row| row.get(0),
            )?;
            debug!("Updated summary for room {} (v{})", room_id, version);
            Ok(version)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Move a room to another organization (consistency self-healing)
    pub async fn reassign_room_org(&self, room_id: &str, org_id: &str) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        let room_id = room_id.to_owned();
        let org_id = org_id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            conn.execute(
                "UPDATE rooms SET org_id = ?1 WHERE id = ?2",
                params![&org_id, &room_id],
            )?;
            Ok(())
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    fn row_to_room(row: &rusqlite::Row) -> rusqlite::Result<Room> {
        Ok(Room {
            id: row.get(0)?,
            org_id: row.get(1)?,
            name: row.get(2)?,
            project_summary: row.get(3)?,
            memory_summary: row.get(4)?,
            summary_version: row.get(5)?,
            created_at: parse_ts(row.get(6)?),
        })
    }

    // ── Messages ──

    pub async fn append_message(
        &self,
        room_id: &str,
        sender: &Sender,
        sender_name: &str,
        role: Role,
        content: &str,
    ) -> Result<Message> {
        let conn = Arc::clone(&self.conn);
        let room_id = room_id.to_owned();
        let sender = sender.clone();
        let sender_name = sender_name.to_owned();
        let content = content.to_owned();

        tokio::task::spawn_blocking(move || {
            let id = Uuid::new_v4().to_string();
            let now = Utc::now();
            let conn = lock(&conn);

            conn.execute(
                "INSERT INTO messages (id, room_id, sender, sender_name, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &id,
                    &room_id,
                    sender.to_string(),
                    &sender_name,
                    role.as_str(),
                    &content,
                    now.to_rfc3339(),
                ],
            )?;

            debug!("Appended {} message to room {}", role, room_id);
            Ok(Message {
                id,
                room_id,
                sender,
                sender_name,
                role,
                content,
                created_at: now,
            })
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// The most recent `limit` messages in a room, returned oldest-first.
    /// Ordering is by creation time with insertion order as tie-break.
    pub async fn recent_messages(&self, room_id: &str, limit: usize) -> Result<Vec<Message>> {
        let conn = Arc::clone(&self.conn);
        let room_id = room_id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let mut stmt = conn.prepare(
                "SELECT id, room_id, sender, sender_name, role, content, created_at
                 FROM messages WHERE room_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )?;
            let mut messages = stmt
                .query_map(params![&room_id, limit as i64], Self::row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            messages.reverse();
            Ok(messages)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// The full ordered message log of a room
    pub async fn room_messages(&self, room_id: &str) -> Result<Vec<Message>> {
        let conn = Arc::clone(&self.conn);
        let room_id = room_id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let mut stmt = conn.prepare(
                "SELECT id, room_id, sender, sender_name, role, content, created_at
                 FROM messages WHERE room_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let messages = stmt
                .query_map(params![&room_id], Self::row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
        let sender_str: String = row.get(2)?;
        let sender = Sender::from_string(&sender_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("invalid sender tag: {}", sender_str).into(),
            )
        })?;
        let role_str: String = row.get(4)?;
        let role = Role::from_string(&role_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("invalid role: {}", role_str).into(),
            )
        })?;

        Ok(Message {
            id: row.get(0)?,
            room_id: row.get(1)?,
            sender,
            sender_name: row.get(3)?,
            role,
            content: row.get(5)?,
            created_at: parse_ts(row.get(6)?),
        })
    }

    // ── Activity feed ──

    pub async fn record_activity(
        &self,
        user_id: &str,
        user_name: &str,
        summary: &str,
    ) -> Result<Activity> {
        let conn = Arc::clone(&self.conn);
        let user_id = user_id.to_owned();
        let user_name = user_name.to_owned();
        let summary = summary.to_owned();

        tokio::task::spawn_blocking(move || {
            let id = Uuid::new_v4().to_string();
            let now = Utc::now();
            let conn = lock(&conn);

            conn.execute(
                "INSERT INTO activities (id, user_id, user_name, summary, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![&id, &user_id, &user_name, &summary, now.to_rfc3339()],
            )?;

            Ok(Activity {
                id,
                user_id,
                user_name,
                summary,
                created_at: now,
            })
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// The most recent `limit` activity entries, returned oldest-first
    pub async fn recent_activity(&self, limit: usize) -> Result<Vec<Activity>> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let mut stmt = conn.prepare(
                "SELECT id, user_id, user_name, summary, created_at
                 FROM activities ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            )?;
            let mut activities = stmt
                .query_map(params![limit as i64], |row| {
                    Ok(Activity {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        user_name: row.get(2)?,
                        summary: row.get(3)?,
                        created_at: parse_ts(row.get(4)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            activities.reverse();
            Ok(activities)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    // ── Agent memory ──

    pub async fn append_memory(
        &self,
        agent: &str,
        room_id: Option<&str>,
        content: &str,
        importance: f64,
    ) -> Result<MemoryRecord> {
        let conn = Arc::clone(&self.conn);
        let agent = agent.to_owned();
        let room_id = room_id.map(|s| s.to_owned());
        let content = content.to_owned();

        tokio::task::spawn_blocking(move || {
            let id = Uuid::new_v4().to_string();
            let now = Utc::now();
            let conn = lock(&conn);

            conn.execute(
                "INSERT INTO memory_records (id, agent, room_id, content, importance, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![&id, &agent, &room_id, &content, importance, now.to_rfc3339()],
            )?;

            debug!("Stored memory for agent {} ({})", agent, id);
            Ok(MemoryRecord {
                id,
                agent,
                room_id,
                content,
                importance,
                created_at: now,
            })
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// The most recent `limit` memory records for an agent, newest-first
    pub async fn recent_memory(&self, agent: &str, limit: usize) -> Result<Vec<MemoryRecord>> {
        let conn = Arc::clone(&self.conn);
        let agent = agent.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let mut stmt = conn.prepare(
                "SELECT id, agent, room_id, content, importance, created_at
                 FROM memory_records WHERE agent = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )?;
            let records = stmt
                .query_map(params![&agent, limit as i64], |row| {
                    Ok(MemoryRecord {
                        id: row.get(0)?,
                        agent: row.get(1)?,
                        room_id: row.get(2)?,
                        content: row.get(3)?,
                        importance: row.get(4)?,
                        created_at: parse_ts(row.get(5)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    // ── Notifications ──

    pub async fn create_notification(&self, user_id: &str, message: &str) -> Result<Notification> {
        let conn = Arc::clone(&self.conn);
        let user_id = user_id.to_owned();
        let message = message.to_owned();

        tokio::task::spawn_blocking(move || {
            let id = Uuid::new_v4().to_string();
            let now = Utc::now();
            let conn = lock(&conn);

            conn.execute(
                "INSERT INTO notifications (id, user_id, message, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![&id, &user_id, &message, now.to_rfc3339()],
            )?;

            debug!("Created notification for user {}", user_id);
            Ok(Notification {
                id,
                user_id,
                message,
                read: false,
                created_at: now,
            })
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    pub async fn notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let conn = Arc::clone(&self.conn);
        let user_id = user_id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let mut stmt = conn.prepare(
                "SELECT id, user_id, message, read, created_at
                 FROM notifications WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let notifications = stmt
                .query_map(params![&user_id], |row| {
                    Ok(Notification {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        message: row.get(2)?,
                        read: row.get::<_, i64>(3)? != 0,
                        created_at: parse_ts(row.get(4)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(notifications)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        let id = id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            conn.execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1",
                params![&id],
            )?;
            Ok(())
        })
        .await
        .context("spawn_blocking task panicked")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_db() -> (WorkspaceDb, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = WorkspaceDb::new(dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let (db, _dir) = test_db().await;
        let user = db.create_user("org-1", "Sean", "sean@example.com").await.unwrap();
        let loaded = db.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Sean");
        assert_eq!(loaded.org_id, "org-1");
        assert!(db.get_user("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_user_by_name_case_insensitive() {
        let (db, _dir) = test_db().await;
        db.create_user("org-1", "Alice", "alice@example.com").await.unwrap();
        db.create_user("org-2", "Bob", "bob@example.com").await.unwrap();

        let found = db.find_user_by_name("org-1", "aLiCe").await.unwrap();
        assert_eq!(found.unwrap().name, "Alice");

        // Scoped to the organization
        assert!(db.find_user_by_name("org-1", "Bob").await.unwrap().is_none());
        assert!(db.find_user_by_name("org-1", "Carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_touch_seen_moves_stamp() {
        let (db, _dir) = test_db().await;
        let user = db.create_user("org-1", "Sean", "sean@example.com").await.unwrap();
        db.touch_seen(&user.id).await.unwrap();
        let loaded = db.get_user(&user.id).await.unwrap().unwrap();
        assert!(loaded.last_seen_at >= user.last_seen_at);
        assert!(loaded.online_within(120));
    }

    #[tokio::test]
    async fn test_room_summary_starts_empty_and_versions() {
        let (db, _dir) = test_db().await;
        let room = db.create_room("org-1", "launch").await.unwrap();
        assert!(room.project_summary.is_none());
        assert_eq!(room.summary_version, 0);

        let v1 = db.update_summary(&room.id, "Kickoff done.").await.unwrap();
        assert_eq!(v1, 1);
        let v2 = db.update_summary(&room.id, "Design agreed.").await.unwrap();
        assert_eq!(v2, 2);

        let loaded = db.get_room(&room.id).await.unwrap().unwrap();
        assert_eq!(loaded.project_summary.as_deref(), Some("Design agreed."));
        assert_eq!(loaded.memory_summary.as_deref(), Some("Design agreed."));
        assert_eq!(loaded.summary_version, 2);
    }

    #[tokio::test]
    async fn test_update_summary_unknown_room_fails() {
        let (db, _dir) = test_db().await;
        assert!(db.update_summary("missing", "text").await.is_err());
    }

    #[tokio::test]
    async fn test_reassign_room_org() {
        let (db, _dir) = test_db().await;
        let room = db.create_room("org-1", "launch").await.unwrap();
        db.reassign_room_org(&room.id, "org-2").await.unwrap();
        let loaded = db.get_room(&room.id).await.unwrap().unwrap();
        assert_eq!(loaded.org_id, "org-2");
    }

    #[tokio::test]
    async fn test_messages_ordered_and_limited() {
        let (db, _dir) = test_db().await;
        let room = db.create_room("org-1", "launch").await.unwrap();
        for i in 0..5 {
            db.append_message(
                &room.id,
                &Sender::User("u-1".to_string()),
                "Sean",
                Role::User,
                &format!("message {}", i),
            )
            .await
            .unwrap();
        }

        let all = db.room_messages(&room.id).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].content, "message 0");
        assert_eq!(all[4].content, "message 4");

        // Most recent three, oldest-first
        let recent = db.recent_messages(&room.id, 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "message 2");
        assert_eq!(recent[2].content, "message 4");
    }

    #[tokio::test]
    async fn test_message_sender_round_trips_through_db() {
        let (db, _dir) = test_db().await;
        let room = db.create_room("org-1", "launch").await.unwrap();
        db.append_message(
            &room.id,
            &Sender::Voice("u-9".to_string()),
            "Yug (voice)",
            Role::Assistant,
            "call transcript",
        )
        .await
        .unwrap();

        let all = db.room_messages(&room.id).await.unwrap();
        assert_eq!(all[0].sender, Sender::Voice("u-9".to_string()));
        assert_eq!(all[0].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_recent_activity_oldest_first() {
        let (db, _dir) = test_db().await;
        for i in 0..4 {
            db.record_activity("u-1", "Sean", &format!("did thing {}", i))
                .await
                .unwrap();
        }
        let recent = db.recent_activity(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].summary, "did thing 2");
        assert_eq!(recent[1].summary, "did thing 3");
    }

    #[tokio::test]
    async fn test_memory_records() {
        let (db, _dir) = test_db().await;
        let room = db.create_room("org-1", "launch").await.unwrap();
        db.append_memory("coordinator", Some(&room.id), "Summary updated", 0.6)
            .await
            .unwrap();
        db.append_memory("sean", None, "Likes short replies", 0.1)
            .await
            .unwrap();

        let records = db.recent_memory("coordinator", 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].room_id.as_deref(), Some(room.id.as_str()));
        assert!((records[0].importance - 0.6).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_notifications_lifecycle() {
        let (db, _dir) = test_db().await;
        let alice = db.create_user("org-1", "Alice", "alice@example.com").await.unwrap();
        let n = db
            .create_notification(&alice.id, "Ping the design team")
            .await
            .unwrap();
        assert!(!n.read);

        let list = db.notifications_for_user(&alice.id).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].message, "Ping the design team");

        db.mark_notification_read(&n.id).await.unwrap();
        let list = db.notifications_for_user(&alice.id).await.unwrap();
        assert!(list[0].read);
    }
}
