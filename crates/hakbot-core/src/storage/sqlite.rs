use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::ChatStore;
use crate::error::{HakbotError, Result};
use crate::model::{ChatMessage, IssuedSession, Role, User};

/// SQLite-backed chat store.
///
/// Uses a single `Connection` behind `Arc<Mutex<>>` so it can be shared
/// across async tasks. All blocking SQLite calls go through
/// [`with_conn`](Self::with_conn) which runs them on the Tokio blocking
/// thread-pool.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteStorage {
    /// Open (or create) a file-backed SQLite database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .map_err(|e| HakbotError::Storage(format!("failed to open SQLite database: {e}")))?;

        Self::configure_and_init(conn, path)
    }

    /// Open an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            HakbotError::Storage(format!("failed to open in-memory SQLite database: {e}"))
        })?;

        Self::configure_and_init(conn, PathBuf::from(":memory:"))
    }

    /// Return the path this database was opened with (`:memory:` for in-memory).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete expired sessions. Returns how many were removed.
    pub async fn purge_expired_sessions(&self) -> Result<usize> {
        let now = timestamp(Utc::now());
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])
                .map_err(sql_err)
        })
        .await
    }

    /// Cheap liveness query for health checks.
    pub async fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(sql_err)
        })
        .await
    }

    // ── helpers ────────────────────────────────────────────────────────

    fn configure_and_init(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| HakbotError::Storage(format!("failed to set WAL mode: {e}")))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| HakbotError::Storage(format!("failed to enable foreign keys: {e}")))?;

        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };

        storage.create_tables()?;
        Ok(storage)
    }

    /// Create all tables and indexes (idempotent).
    fn create_tables(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| HakbotError::Storage(format!("failed to acquire database lock: {e}")))?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT,
                grade INTEGER,
                class_num INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                token_hash TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_messages_user_created ON messages(user_id, created_at);
            ",
        )
        .map_err(|e| HakbotError::Storage(format!("failed to create tables: {e}")))?;

        Ok(())
    }

    /// Run a blocking closure against the SQLite connection on the Tokio
    /// blocking thread-pool.
    pub(crate) async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                HakbotError::Storage(format!("failed to acquire database lock: {e}"))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| HakbotError::Storage(format!("task join error: {e}")))?
    }
}

impl ChatStore for SqliteStorage {
    async fn upsert_user(&self, user: &User) -> Result<User> {
        let user = user.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, grade, class_num, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(email) DO UPDATE SET
                    name = COALESCE(excluded.name, users.name),
                    grade = COALESCE(excluded.grade, users.grade),
                    class_num = COALESCE(excluded.class_num, users.class_num)",
                params![
                    user.id,
                    user.email,
                    user.name,
                    user.grade,
                    user.class_num,
                    timestamp(user.created_at),
                ],
            )
            .map_err(sql_err)?;

            conn.query_row(
                "SELECT id, email, name, grade, class_num, created_at FROM users WHERE email = ?1",
                params![user.email],
                row_to_user,
            )
            .map_err(sql_err)
        })
        .await
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, email, name, grade, class_num, created_at FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()
            .map_err(sql_err)?
            .ok_or_else(|| HakbotError::NotFound(format!("user {id}")))
        })
        .await
    }

    async fn create_session(&self, user_id: &str, ttl: Duration) -> Result<IssuedSession> {
        let now = Utc::now();
        let session = IssuedSession {
            token: new_token(),
            user_id: user_id.to_string(),
            expires_at: now + ttl,
        };
        let token_hash = hash_token(&session.token);
        let user_id = session.user_id.clone();
        let expires_at = timestamp(session.expires_at);

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![token_hash, user_id, timestamp(now), expires_at],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(ref f, _)
                    if f.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    HakbotError::NotFound(format!("user {user_id}"))
                }
                other => sql_err(other),
            })?;
            Ok(())
        })
        .await?;

        Ok(session)
    }

    async fn resolve_session(&self, token: &str) -> Result<Option<User>> {
        let token_hash = hash_token(token);
        let now = timestamp(Utc::now());
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT u.id, u.email, u.name, u.grade, u.class_num, u.created_at
                 FROM sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token_hash = ?1 AND s.expires_at > ?2",
                params![token_hash, now],
                row_to_user,
            )
            .optional()
            .map_err(sql_err)
        })
        .await
    }

    async fn revoke_session(&self, token: &str) -> Result<bool> {
        let token_hash = hash_token(token);
        self.with_conn(move |conn| {
            let removed = conn
                .execute(
                    "DELETE FROM sessions WHERE token_hash = ?1",
                    params![token_hash],
                )
                .map_err(sql_err)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn append_messages(&self, messages: &[ChatMessage]) -> Result<()> {
        let messages = messages.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.unchecked_transaction().map_err(sql_err)?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO messages (id, user_id, role, text, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                    )
                    .map_err(sql_err)?;
                for msg in &messages {
                    stmt.execute(params![
                        msg.id.to_string(),
                        msg.user_id,
                        msg.role.to_string(),
                        msg.text,
                        timestamp(msg.created_at),
                    ])
                    .map_err(sql_err)?;
                }
            }
            tx.commit().map_err(sql_err)
        })
        .await
    }

    async fn history(&self, user_id: &str) -> Result<Vec<ChatMessage>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, role, text, created_at FROM messages
                     WHERE user_id = ?1
                     ORDER BY created_at ASC, rowid ASC",
                )
                .map_err(sql_err)?;
            let messages = stmt
                .query_map(params![user_id], row_to_message)
                .map_err(sql_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(sql_err)?;
            Ok(messages)
        })
        .await
    }
}

// ── row mapping ────────────────────────────────────────────────────────

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        grade: row.get(3)?,
        class_num: row.get(4)?,
        created_at: parse_timestamp(5, &row.get::<_, String>(5)?)?,
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    let id: String = row.get(0)?;
    let role: String = row.get(2)?;
    Ok(ChatMessage {
        id: Uuid::parse_str(&id).map_err(|e| conversion_err(0, e))?,
        user_id: row.get(1)?,
        role: role
            .parse::<Role>()
            .map_err(|e| conversion_err(2, std::io::Error::other(e)))?,
        text: row.get(3)?,
        created_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
    })
}

fn conversion_err(
    col: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(err))
}

/// Fixed-width UTC timestamps so string order matches time order.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(col: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(col, e))
}

fn sql_err(e: rusqlite::Error) -> HakbotError {
    HakbotError::Storage(e.to_string())
}

fn new_token() -> String {
    format!(
        "hkb_{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// SHA-256 of a session token (lowercase hex).
pub(crate) fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{:x}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_user() -> (SqliteStorage, User) {
        let storage = SqliteStorage::open_in_memory().expect("should open in-memory DB");
        let user = storage
            .upsert_user(&User::new("kim@school.kr").with_class(2, 3))
            .await
            .unwrap();
        (storage, user)
    }

    #[test]
    fn open_in_memory_creates_tables() {
        let storage = SqliteStorage::open_in_memory().expect("should open in-memory DB");
        assert_eq!(storage.path().to_str().unwrap(), ":memory:");

        let conn = storage.conn.lock().unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"sessions".to_string()));
        assert!(tables.contains(&"messages".to_string()));
    }

    #[test]
    fn create_tables_is_idempotent() {
        let storage = SqliteStorage::open_in_memory().expect("should open in-memory DB");
        storage.create_tables().expect("idempotent create_tables");
    }

    #[tokio::test]
    async fn upsert_user_keeps_id_and_merges_fields() {
        let (storage, first) = store_with_user().await;
        assert_eq!(first.home_class().as_deref(), Some("2-3"));

        let again = storage
            .upsert_user(&User::new("kim@school.kr").with_name("Kim"))
            .await
            .unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.name.as_deref(), Some("Kim"));
        assert_eq!(again.grade, Some(2));
        assert_eq!(again.class_num, Some(3));
    }

    #[tokio::test]
    async fn get_user_not_found() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let err = storage.get_user("missing").await.unwrap_err();
        assert!(matches!(err, HakbotError::NotFound(_)));
    }

    #[tokio::test]
    async fn session_roundtrip_and_revoke() {
        let (storage, user) = store_with_user().await;
        let session = storage
            .create_session(&user.id, Duration::hours(1))
            .await
            .unwrap();
        assert!(session.token.starts_with("hkb_"));

        let resolved = storage.resolve_session(&session.token).await.unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(user.id.clone()));

        assert!(storage.resolve_session("hkb_wrong").await.unwrap().is_none());

        assert!(storage.revoke_session(&session.token).await.unwrap());
        assert!(!storage.revoke_session(&session.token).await.unwrap());
        assert!(storage.resolve_session(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_session_does_not_resolve() {
        let (storage, user) = store_with_user().await;
        let session = storage
            .create_session(&user.id, Duration::seconds(-5))
            .await
            .unwrap();
        assert!(storage.resolve_session(&session.token).await.unwrap().is_none());
        assert_eq!(storage.purge_expired_sessions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn session_for_unknown_user_is_rejected() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let err = storage
            .create_session("ghost", Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, HakbotError::NotFound(_)));
    }

    #[tokio::test]
    async fn token_is_stored_hashed() {
        let (storage, user) = store_with_user().await;
        let session = storage
            .create_session(&user.id, Duration::hours(1))
            .await
            .unwrap();
        let stored: String = storage
            .with_conn(|conn| {
                conn.query_row("SELECT token_hash FROM sessions", [], |row| row.get(0))
                    .map_err(sql_err)
            })
            .await
            .unwrap();
        assert_ne!(stored, session.token);
        assert_eq!(stored, hash_token(&session.token));
        assert_eq!(stored.len(), 64);
    }

    #[tokio::test]
    async fn history_is_ordered_and_scoped() {
        let (storage, user) = store_with_user().await;
        let other = storage
            .upsert_user(&User::new("lee@school.kr"))
            .await
            .unwrap();

        storage
            .append_messages(&ChatMessage::exchange(&user.id, "오늘 급식", "first answer"))
            .await
            .unwrap();
        storage
            .append_messages(&ChatMessage::exchange(&other.id, "행사", "other answer"))
            .await
            .unwrap();
        storage
            .append_messages(&ChatMessage::exchange(&user.id, "시간표", "second answer"))
            .await
            .unwrap();

        let history = storage.history(&user.id).await.unwrap();
        let texts: Vec<_> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["오늘 급식", "first answer", "시간표", "second answer"]);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Bot);

        assert_eq!(storage.history(&other.id).await.unwrap().len(), 2);
        assert!(storage.history("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_for_unknown_user_fails_atomically() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let result = storage
            .append_messages(&ChatMessage::exchange("ghost", "q", "a"))
            .await;
        assert!(result.is_err());
        assert!(storage.history("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ping_succeeds() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.ping().await.unwrap();
    }

    #[test]
    fn open_file_based_db() {
        let dir = std::env::temp_dir().join(format!("hakbot-test-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let db_path = dir.join("test.db");

        let storage = SqliteStorage::open(&db_path).expect("should open file DB");
        assert_eq!(storage.path(), db_path);

        drop(storage);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
