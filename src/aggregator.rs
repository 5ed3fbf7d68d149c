// Merges process snapshots from every reachable instance into one AggregationResult.
// Instances are queried concurrently; results are merged in registry order.

use futures_util::future::join_all;
use tracing::{debug, instrument, warn};

use crate::models::{AggregationResult, ProcessInfo, ProcessRecord};
use crate::registry::Instance;

/// One aggregation pass over `instances`.
///
/// Unreachable instances (failed connectivity check or failed process listing) are
/// listed in `unreachable` and contribute nothing else. Records keep the remote's order
/// within an instance; instances appear in the order given.
#[instrument(skip_all, fields(instances = instances.len()))]
pub async fn aggregate(instances: &[Instance]) -> AggregationResult {
    let snapshots = join_all(instances.iter().map(snapshot)).await;

    let mut result = AggregationResult::default();
    for (instance, snapshot) in instances.iter().zip(snapshots) {
        match snapshot {
            Some(infos) => {
                for info in infos {
                    result.push(ProcessRecord::from_info(&instance.name, info));
                }
            }
            None => result.unreachable.push(instance.name.clone()),
        }
    }
    debug!(
        processes = result.total(),
        not_running = result.not_running,
        unreachable = result.unreachable.len(),
        "aggregation complete"
    );
    result
}

async fn snapshot(instance: &Instance) -> Option<Vec<ProcessInfo>> {
    if !instance.client.is_connected().await {
        warn!(instance = %instance.name, "instance unreachable, skipping");
        return None;
    }
    match instance.client.get_all_process_info().await {
        Ok(infos) => Some(infos),
        Err(e) => {
            warn!(
                instance = %instance.name,
                error = %e,
                operation = "get_all_process_info",
                "process listing failed, treating instance as unreachable"
            );
            None
        }
    }
}
