use std::sync::Arc;

use askama::Template;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(index))
}

/// Sample questions shown as buttons under the chat box.
const EXAMPLE_QUESTIONS: [&str; 4] = [
    "오늘 급식 뭐야?",
    "내일 점심 메뉴",
    "2학년 3반 월요일 시간표",
    "다가오는 행사 알려줘",
];

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    examples: Vec<&'static str>,
    timezone: String,
}

async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let tmpl = IndexTemplate {
        examples: EXAMPLE_QUESTIONS.to_vec(),
        timezone: state.interpreter.timezone().to_string(),
    };
    Ok(Html(tmpl.render()?))
}
