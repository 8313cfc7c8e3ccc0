//! Session authentication extractor.
//!
//! Reads the session token from:
//! - `Authorization: Bearer <token>` header
//! - `hakbot_session=<token>` cookie
//!
//! Tokens are resolved through the chat store, which keeps only their hash.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use hakbot_core::model::User;
use hakbot_core::storage::ChatStore;

use crate::error::ApiError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "hakbot_session";

/// Message returned with every 401.
pub const LOGIN_REQUIRED: &str = "로그인 필요";

/// A request made with a valid, unexpired session.
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts).ok_or_else(|| ApiError::unauthorized(LOGIN_REQUIRED))?;

        match state.store.resolve_session(&token).await? {
            Some(user) => Ok(AuthUser { user, token }),
            None => Err(ApiError::unauthorized(LOGIN_REQUIRED)),
        }
    }
}

/// Session token from the Authorization header, falling back to the cookie.
fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(auth) = parts.headers.get("authorization") {
        if let Some(token) = auth
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            return Some(token.to_string());
        }
    }

    parts
        .headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
