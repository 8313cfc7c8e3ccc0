use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get};
use axum::Router;
use hakbot_core::model::User;
use hakbot_core::storage::ChatStore;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/auth/session", delete(sign_out))
}

async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

/// Revoke the session the request was made with.
async fn sign_out(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<StatusCode, ApiError> {
    state.store.revoke_session(&auth.token).await?;
    tracing::info!(user_id = %auth.user.id, "session revoked");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use hakbot_core::model::User;
    use hakbot_core::storage::ChatStore;
    use tower::ServiceExt;

    fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_me_returns_profile() {
        let data = data_dir();
        let state = test_app_state(&data);
        let user = User::new("choi@school.ph")
            .with_name("Choi")
            .with_class(1, 1);
        let user = state.store.upsert_user(&user).await.unwrap();
        let session = state
            .store
            .create_session(&user.id, chrono::Duration::hours(1))
            .await
            .unwrap();

        let resp = test_router(state)
            .oneshot(authed("GET", "/api/auth/me", &session.token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["id"], user.id.as_str());
        assert_eq!(json["email"], "choi@school.ph");
        assert_eq!(json["name"], "Choi");
        assert_eq!(json["grade"], 1);
        assert_eq!(json["classNum"], 1);
    }

    #[tokio::test]
    async fn test_sign_out_revokes_token() {
        let data = data_dir();
        let state = test_app_state(&data);
        let user = state
            .store
            .upsert_user(&User::new("jung@school.ph"))
            .await
            .unwrap();
        let session = state
            .store
            .create_session(&user.id, chrono::Duration::hours(1))
            .await
            .unwrap();
        let app = test_router(state);

        let resp = app
            .clone()
            .oneshot(authed("DELETE", "/api/auth/session", &session.token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app
            .oneshot(authed("GET", "/api/auth/me", &session.token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let data = data_dir();
        let state = test_app_state(&data);
        let user = state
            .store
            .upsert_user(&User::new("han@school.ph"))
            .await
            .unwrap();
        let session = state
            .store
            .create_session(&user.id, chrono::Duration::seconds(-1))
            .await
            .unwrap();

        let resp = test_router(state)
            .oneshot(authed("GET", "/api/auth/me", &session.token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
