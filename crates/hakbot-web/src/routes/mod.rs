pub mod chat;
pub mod pages;
pub mod session;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, Json};
use axum::routing::get;
use axum::Router;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(pages::routes())
        .merge(chat::routes())
        .merge(session::routes())
        .fallback(not_found)
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let db_ok = state.store.ping().await.is_ok();
    let data_ok = match state.data.load_all().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("health: school data unavailable: {e}");
            false
        }
    };

    let status = if db_ok && data_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "status": if db_ok && data_ok { "ok" } else { "degraded" },
            "storage": if db_ok { "connected" } else { "unavailable" },
            "data": if data_ok { "readable" } else { "unavailable" },
            "data_dir": state.config.data.dir,
        })),
    )
}

async fn not_found() -> (StatusCode, Html<String>) {
    let body = r#"<!doctype html>
<html lang="ko"><head><title>404 - 학봇</title>
<style>body{font-family:system-ui;background:#f5f7fb;color:#222;display:flex;justify-content:center;align-items:center;height:100vh;margin:0}
.box{text-align:center}
h1{font-size:4rem;color:#2d6cdf;margin:0}
p{color:#777;margin:0.5rem 0 1.5rem}
a{color:#2d6cdf;text-decoration:none;padding:0.5rem 1rem;border:1px solid #d5dcea;border-radius:8px}
a:hover{border-color:#2d6cdf}</style>
</head><body><div class="box"><h1>404</h1><p>페이지를 찾을 수 없습니다.</p><a href="/">챗봇으로 돌아가기</a></div></body></html>"#;
    (StatusCode::NOT_FOUND, Html(body.to_string()))
}
