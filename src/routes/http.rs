// GET handlers: dashboard view, version, instance list

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use futures_util::future::join_all;
use serde::Serialize;

use super::AppState;
use crate::aggregator::aggregate;
use crate::error::MonitorError;
use crate::view::{DashboardView, ViewQuery, build_view};

/// GET /: aggregated, filtered and sorted process view as JSON.
pub(super) async fn index(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<DashboardView>, MonitorError> {
    let instances = state.registry.get_all()?;
    let result = aggregate(&instances).await;
    Ok(Json(build_view(
        result,
        &query,
        &state.config.server.base_path,
    )))
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct InstanceStatus {
    name: String,
    url: String,
    reachable: bool,
}

/// GET /api/instances: configured instances and whether each answers right now.
pub(super) async fn instances_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<InstanceStatus>>, MonitorError> {
    let instances = state.registry.get_all()?;
    let reachable = join_all(instances.iter().map(|i| i.client.is_connected())).await;
    let statuses = state
        .registry
        .configs()
        .iter()
        .zip(reachable)
        .map(|(c, reachable)| InstanceStatus {
            name: c.name.clone(),
            url: c.url.clone(),
            reachable,
        })
        .collect();
    Ok(Json(statuses))
}
