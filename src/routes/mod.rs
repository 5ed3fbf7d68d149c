// HTTP routes: dashboard view, actions (redirecting), streaming tails

mod actions;
mod http;
mod tail;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::MonitorError;
use crate::registry::InstanceRegistry;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) registry: Arc<InstanceRegistry>,
    pub(crate) tail_sessions: Arc<AtomicUsize>,
    pub(crate) config: AppConfig,
}

pub fn app(
    registry: Arc<InstanceRegistry>,
    tail_sessions: Arc<AtomicUsize>,
    config: AppConfig,
) -> Router {
    let state = AppState {
        registry,
        tail_sessions,
        config,
    };
    Router::new()
        .route("/", get(http::index)) // GET /?layout=&filter=&filter_value=&sort=
        .route("/version", get(http::version_handler))
        .route("/api/instances", get(http::instances_handler))
        // Global actions
        .route("/start", get(actions::start_all_servers))
        .route("/restart", get(actions::restart_all_servers))
        .route("/stop", get(actions::stop_all_servers))
        .route("/clearAllProcessLogs", get(actions::clear_all_process_logs))
        // Instance actions
        .route("/start/{instance}", get(actions::start_all))
        .route("/restart/{instance}", get(actions::restart_all))
        .route("/stop/{instance}", get(actions::stop_all))
        .route(
            "/clearAllProcessLogs/{instance}",
            get(actions::clear_all_process_logs_instance),
        )
        // Process actions
        .route("/start/{instance}/{process}", get(actions::start_process))
        .route("/restart/{instance}/{process}", get(actions::restart_process))
        .route("/stop/{instance}/{process}", get(actions::stop_process))
        .route(
            "/clearProcessLogs/{instance}/{process}",
            get(actions::clear_process_logs),
        )
        // Group actions
        .route("/group/start/{group}", get(actions::start_group))
        .route("/group/restart/{group}", get(actions::restart_group))
        .route("/group/stop/{group}", get(actions::stop_group))
        // Streaming tails
        .route("/tailStdout/{instance}/{process}", get(tail::tail_stdout))
        .route("/tailStderr/{instance}/{process}", get(tail::tail_stderr))
        .route("/tail/{kind}/{instance}/{process}", get(tail::tail_kind))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = match &self {
            MonitorError::UnknownInstance(_) => StatusCode::NOT_FOUND,
            MonitorError::UnsupportedLogType(_) => StatusCode::BAD_REQUEST,
            MonitorError::Remote { .. } => StatusCode::BAD_GATEWAY,
        };
        tracing::info!(status = status.as_u16(), error = %self, "request failed");
        (status, self.to_string()).into_response()
    }
}
