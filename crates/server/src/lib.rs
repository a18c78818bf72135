//! Matching engine server
//!
//! Exposes the engine's cron/trigger surface plus health and metrics
//! endpoints over HTTP.

pub mod app;
pub mod engine_runner;
pub mod metrics;

pub use app::{create_router, AppState};
pub use engine_runner::{run_cron_tick, EngineRunResponse};
pub use metrics::init_metrics;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Persistence(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
