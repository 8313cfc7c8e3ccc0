use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use hakbot_core::chat;
use hakbot_core::interpret::QueryContext;
use hakbot_core::model::ChatMessage;
use hakbot_core::storage::ChatStore;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/query", post(guest_query))
        .route("/api/chat", post(chat_message))
        .route("/api/chat/history", get(history))
}

/// Body of both chat endpoints: `{ "query": ... }` or `{ "text": ... }`.
/// `query` wins when both are sent; missing or null reads as empty.
#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl QueryRequest {
    pub fn into_query(self) -> String {
        self.query.or(self.text).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

/// Anonymous question. Nothing is stored.
async fn guest_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let query = req.into_query();
    let data = state.data.load_all().await?;
    let answer = state.interpreter.interpret(&query, &data);
    tracing::debug!(query = %query, "guest query answered");
    Ok(Json(AnswerResponse { answer }))
}

/// Signed-in question. The user's own class fills in for timetable queries
/// that name none, and the exchange is appended to their history.
async fn chat_message(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<QueryRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let query = req.into_query();
    let data = state.data.load_all().await?;
    let ctx = QueryContext::current().with_home_class(auth.user.home_class());
    let answer = state.interpreter.interpret_with(&query, &data, &ctx);

    chat::record_exchange(&state.store, &auth.user.id, &query, &answer).await;

    Ok(Json(AnswerResponse { answer }))
}

async fn history(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let messages = state.store.history(&auth.user.id).await?;
    Ok(Json(messages))
}
