// Periodic "app stats" log line: configured/connected instances and live tail sessions.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{Duration, interval};

use crate::registry::InstanceRegistry;

pub fn spawn(
    registry: Arc<InstanceRegistry>,
    tail_sessions: Arc<AtomicUsize>,
    stats_log_interval_secs: u64,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(stats_log_interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; skip it so the first line reports a real interval.
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    tracing::info!(
                        configured_instances = registry.len(),
                        connected_instances = registry.connected_count(),
                        active_tail_sessions = tail_sessions.load(Ordering::Relaxed),
                        "app stats"
                    );
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Stats logger shutting down");
                    break;
                }
            }
        }
    })
}
