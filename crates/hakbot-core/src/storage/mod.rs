mod sqlite;

pub use sqlite::SqliteStorage;

use std::future::Future;

use chrono::Duration;

use crate::config::HakbotConfig;
use crate::error::Result;
use crate::model::{ChatMessage, IssuedSession, User};

/// Persistence for users, sessions and chat history.
///
/// Futures are `Send` so handlers can hold them across `.await` inside axum.
pub trait ChatStore: Send + Sync {
    /// Insert the user, or update name/class of the existing user with the
    /// same email. Returns the stored row (existing id preserved).
    fn upsert_user(&self, user: &User) -> impl Future<Output = Result<User>> + Send;

    fn get_user(&self, id: &str) -> impl Future<Output = Result<User>> + Send;

    fn create_session(
        &self,
        user_id: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<IssuedSession>> + Send;

    /// The user owning an unexpired session token, if any.
    fn resolve_session(&self, token: &str) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Returns `true` when a session was removed.
    fn revoke_session(&self, token: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Append messages atomically, in the given order.
    fn append_messages(&self, messages: &[ChatMessage]) -> impl Future<Output = Result<()>> + Send;

    /// All messages of a user, oldest first.
    fn history(&self, user_id: &str) -> impl Future<Output = Result<Vec<ChatMessage>>> + Send;
}

/// Open the SQLite store at the configured path, creating parent directories.
pub fn open_store(config: &HakbotConfig) -> Result<SqliteStorage> {
    let path = config.storage.resolve_path()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| crate::error::HakbotError::io(parent, e))?;
        }
    }
    SqliteStorage::open(&path)
}
