// Streaming tail handlers: validate, open the session task, stream its fragments

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_stream::wrappers::ReceiverStream;

use super::AppState;
use crate::error::MonitorError;
use crate::tail::{self, LogKind, TailSession, TailSettings};

/// Decrements the active tail session count on drop (open = +1, drop = -1).
struct TailSessionGuard(Arc<AtomicUsize>);

impl TailSessionGuard {
    fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self(count)
    }
}

impl Drop for TailSessionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub(super) async fn tail_stdout(
    State(state): State<AppState>,
    Path((instance, process)): Path<(String, String)>,
) -> Result<Response, MonitorError> {
    open(state, Ok(LogKind::Stdout), instance, process)
}

pub(super) async fn tail_stderr(
    State(state): State<AppState>,
    Path((instance, process)): Path<(String, String)>,
) -> Result<Response, MonitorError> {
    open(state, Ok(LogKind::Stderr), instance, process)
}

/// GET /tail/{kind}/{instance}/{process}: `kind` must be stdout or stderr.
pub(super) async fn tail_kind(
    State(state): State<AppState>,
    Path((kind, instance, process)): Path<(String, String, String)>,
) -> Result<Response, MonitorError> {
    open(state, kind.parse(), instance, process)
}

fn open(
    state: AppState,
    kind: Result<LogKind, MonitorError>,
    instance: String,
    process: String,
) -> Result<Response, MonitorError> {
    let kind = kind?;
    let client = state.registry.get(&instance)?;

    tracing::info!(
        instance = %instance,
        process = %process,
        log = kind.as_str(),
        "tail session opened"
    );
    let session = TailSession {
        client,
        instance,
        process,
        kind,
        settings: TailSettings::from(&state.config.tail),
    };
    let guard = TailSessionGuard::new(state.tail_sessions.clone());
    let (rx, handle) = tail::spawn(session);
    tokio::spawn(async move {
        let _guard = guard;
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "tail session task failed");
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
        .into_response())
}
