//! HTTP surface: health/readiness/metrics plus the single cron trigger
//! endpoint described in §6.3.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use kindred_config::Settings;
use kindred_core::EngineDependencies;
use kindred_persistence::EngineStore;
use tower_http::trace::TraceLayer;

use crate::engine_runner::run_cron_tick;
use crate::metrics::metrics_handler;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EngineStore>,
    pub settings: Arc<Settings>,
    pub deps: EngineDependencies,
}

impl AppState {
    pub fn new(store: Arc<dyn EngineStore>, settings: Settings, deps: EngineDependencies) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
            deps,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/engine/tick", post(trigger_tick))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.load_engine_state().await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "persona_count": snapshot.state.personas.len(),
                "cursor": snapshot.cursor,
            })),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "not_ready", "reason": err.to_string() })),
        ),
    }
}

async fn trigger_tick(State(state): State<AppState>) -> impl IntoResponse {
    let response = run_cron_tick(state.store.as_ref(), &state.settings, &state.deps).await;
    Json(response)
}
