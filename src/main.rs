use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use supervisor_monitor::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        instances = app_config.instances.len(),
        wait_for_supervisor = app_config.supervisor.wait_for_supervisor,
        "config loaded"
    );

    let connector = Arc::new(supervisor::XmlRpcConnector::new(Duration::from_secs(
        app_config.supervisor.request_timeout_secs,
    )));
    let registry = Arc::new(registry::InstanceRegistry::new(
        app_config.instances.clone(),
        connector,
    ));
    let tail_sessions = Arc::new(AtomicUsize::new(0));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let stats_handle = stats::spawn(
        registry.clone(),
        tail_sessions.clone(),
        app_config.monitoring.stats_log_interval_secs,
        shutdown_rx,
    );

    let app = routes::app(registry, tail_sessions, app_config.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    // Tail responses never finish on their own, so shutdown drops the server instead of
    // draining it.
    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = stats_handle.await;
        }
    }

    Ok(())
}
