use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use dispatch_core::delivery::SAVE_PATH;
use dispatch_core::SaveResponse;
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::{AppError, TEXT_REQUIRED};
use crate::pool::ConnectionPool;
use crate::reports;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pool: Arc<ConnectionPool>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, pool: Arc<ConnectionPool>) -> Self {
        Self { config, pool }
    }
}

pub fn app_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/healthz", get(healthz))
        .route(SAVE_PATH, post(save).fallback(method_not_allowed));

    if let Some(static_dir) = state.config.static_dir.as_ref() {
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn save(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SaveResponse>, AppError> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::debug!("Rejected save body: {}", rejection.body_text());
        AppError::validation(TEXT_REQUIRED)
    })?;

    let text = body
        .get("text")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AppError::validation(TEXT_REQUIRED))?;

    let conn = state.pool.acquire().await.map_err(AppError::internal)?;
    let record = reports::insert_report(&conn, text)
        .await
        .map_err(AppError::internal)?;

    tracing::info!(id = %record.id, "Report saved");
    Ok(Json(SaveResponse::saved(record)))
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
