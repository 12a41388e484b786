use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::web::{AppState, classify, history};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/classify", post(classify::classify_text))
        .route("/api/history", get(history::list_history))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
