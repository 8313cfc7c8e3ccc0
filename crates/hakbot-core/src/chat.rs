//! Recording question/answer pairs for signed-in users.

use crate::model::ChatMessage;
use crate::storage::ChatStore;

/// Persist a question and its answer as two ordered messages.
///
/// Storage failures are logged and swallowed: the caller already has the
/// answer and returns it regardless. Returns whether the pair was saved.
pub async fn record_exchange<S: ChatStore>(
    store: &S,
    user_id: &str,
    query: &str,
    answer: &str,
) -> bool {
    let messages = ChatMessage::exchange(user_id, query, answer);
    match store.append_messages(&messages).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(user_id, "chat: failed to save messages: {e}");
            false
        }
    }
}
