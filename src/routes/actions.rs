// Mutating GET handlers. All of them redirect back to the base path; remote failures
// are logged by the action layer and never change the response.

use axum::{
    extract::{Path, State},
    response::Redirect,
};

use super::AppState;
use crate::actions::{self, Action};
use crate::error::MonitorError;
use crate::registry::Instance;

fn back(state: &AppState) -> Redirect {
    Redirect::to(&state.config.server.base_path)
}

fn wait(state: &AppState) -> bool {
    state.config.supervisor.wait_for_supervisor
}

fn instance(state: &AppState, name: &str) -> Result<Instance, MonitorError> {
    Ok(Instance {
        name: name.to_string(),
        client: state.registry.get(name)?,
    })
}

async fn all_servers(state: AppState, action: Action) -> Result<Redirect, MonitorError> {
    let instances = state.registry.get_all()?;
    actions::apply_all(&instances, action, wait(&state)).await;
    Ok(back(&state))
}

pub(super) async fn start_all_servers(
    State(state): State<AppState>,
) -> Result<Redirect, MonitorError> {
    all_servers(state, Action::Start).await
}

pub(super) async fn restart_all_servers(
    State(state): State<AppState>,
) -> Result<Redirect, MonitorError> {
    all_servers(state, Action::Restart).await
}

pub(super) async fn stop_all_servers(
    State(state): State<AppState>,
) -> Result<Redirect, MonitorError> {
    all_servers(state, Action::Stop).await
}

async fn one_instance(
    state: AppState,
    name: &str,
    action: Action,
) -> Result<Redirect, MonitorError> {
    let instance = instance(&state, name)?;
    actions::apply_instance(&instance, action, wait(&state)).await;
    Ok(back(&state))
}

pub(super) async fn start_all(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Redirect, MonitorError> {
    one_instance(state, &name, Action::Start).await
}

pub(super) async fn restart_all(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Redirect, MonitorError> {
    one_instance(state, &name, Action::Restart).await
}

pub(super) async fn stop_all(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Redirect, MonitorError> {
    one_instance(state, &name, Action::Stop).await
}

async fn one_process(
    state: AppState,
    name: &str,
    process: &str,
    action: Action,
) -> Result<Redirect, MonitorError> {
    let instance = instance(&state, name)?;
    actions::apply_process(&instance, process, action, wait(&state)).await;
    Ok(back(&state))
}

pub(super) async fn start_process(
    State(state): State<AppState>,
    Path((name, process)): Path<(String, String)>,
) -> Result<Redirect, MonitorError> {
    one_process(state, &name, &process, Action::Start).await
}

pub(super) async fn restart_process(
    State(state): State<AppState>,
    Path((name, process)): Path<(String, String)>,
) -> Result<Redirect, MonitorError> {
    one_process(state, &name, &process, Action::Restart).await
}

pub(super) async fn stop_process(
    State(state): State<AppState>,
    Path((name, process)): Path<(String, String)>,
) -> Result<Redirect, MonitorError> {
    one_process(state, &name, &process, Action::Stop).await
}

async fn group_action(
    state: AppState,
    group: &str,
    action: Action,
) -> Result<Redirect, MonitorError> {
    let instances = state.registry.get_all()?;
    actions::apply_group(&instances, group, action, wait(&state)).await;
    Ok(back(&state))
}

pub(super) async fn start_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Redirect, MonitorError> {
    group_action(state, &name, Action::Start).await
}

pub(super) async fn restart_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Redirect, MonitorError> {
    group_action(state, &name, Action::Restart).await
}

pub(super) async fn stop_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Redirect, MonitorError> {
    group_action(state, &name, Action::Stop).await
}

pub(super) async fn clear_all_process_logs(
    State(state): State<AppState>,
) -> Result<Redirect, MonitorError> {
    let instances = state.registry.get_all()?;
    actions::clear_all_logs(&instances).await;
    Ok(back(&state))
}

pub(super) async fn clear_all_process_logs_instance(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Redirect, MonitorError> {
    let instance = instance(&state, &name)?;
    actions::clear_instance_logs(&instance).await;
    Ok(back(&state))
}

pub(super) async fn clear_process_logs(
    State(state): State<AppState>,
    Path((name, process)): Path<(String, String)>,
) -> Result<Redirect, MonitorError> {
    let instance = instance(&state, &name)?;
    actions::clear_process_logs(&instance, &process).await;
    Ok(back(&state))
}
