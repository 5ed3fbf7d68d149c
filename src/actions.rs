// Start/stop/restart and log clearing at every scope.
//
// Every call is best-effort: a failing remote call is logged and counted, and the
// remaining calls still run. Restart is stop followed by start; the start is attempted
// even when the stop failed (stopping a process that is not running is a fault on the
// remote but must not prevent it from being started).

use tracing::{info, warn};

use crate::registry::Instance;
use crate::supervisor::RpcError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Restart,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
        }
    }
}

/// Tally of remote calls made by one action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub calls: usize,
    pub failures: usize,
}

impl Outcome {
    fn record(&mut self, instance: &str, operation: &str, result: Result<(), RpcError>) {
        self.calls += 1;
        if let Err(e) = result {
            self.failures += 1;
            warn!(instance, operation, error = %e, "remote call failed");
        }
    }

    fn merge(&mut self, other: Outcome) {
        self.calls += other.calls;
        self.failures += other.failures;
    }
}

/// `action` on every process of `instance`.
pub async fn apply_instance(instance: &Instance, action: Action, wait: bool) -> Outcome {
    let mut outcome = Outcome::default();
    let client = &instance.client;
    if matches!(action, Action::Stop | Action::Restart) {
        outcome.record(
            &instance.name,
            "stop_all_processes",
            client.stop_all_processes(wait).await,
        );
    }
    if matches!(action, Action::Start | Action::Restart) {
        outcome.record(
            &instance.name,
            "start_all_processes",
            client.start_all_processes(wait).await,
        );
    }
    outcome
}

/// `action` on every process of every instance, instance by instance.
pub async fn apply_all(instances: &[Instance], action: Action, wait: bool) -> Outcome {
    let mut outcome = Outcome::default();
    for instance in instances {
        outcome.merge(apply_instance(instance, action, wait).await);
    }
    info!(
        action = action.as_str(),
        calls = outcome.calls,
        failures = outcome.failures,
        "global action complete"
    );
    outcome
}

/// `action` on one process (`group:name` or bare name) of `instance`.
pub async fn apply_process(
    instance: &Instance,
    process: &str,
    action: Action,
    wait: bool,
) -> Outcome {
    let mut outcome = Outcome::default();
    let client = &instance.client;
    if matches!(action, Action::Stop | Action::Restart) {
        outcome.record(
            &instance.name,
            "stop_process",
            client.stop_process(process, wait).await,
        );
    }
    if matches!(action, Action::Start | Action::Restart) {
        outcome.record(
            &instance.name,
            "start_process",
            client.start_process(process, wait).await,
        );
    }
    outcome
}

/// `action` on `group` on every instance that currently runs a process of that group.
/// Instances that cannot list their processes are skipped.
pub async fn apply_group(
    instances: &[Instance],
    group: &str,
    action: Action,
    wait: bool,
) -> Outcome {
    let mut outcome = Outcome::default();
    for instance in instances {
        let has_group = match instance.client.get_all_process_info().await {
            Ok(infos) => infos.iter().any(|p| p.group == group),
            Err(e) => {
                warn!(
                    instance = %instance.name,
                    group,
                    error = %e,
                    operation = "get_all_process_info",
                    "skipping instance for group action"
                );
                false
            }
        };
        if !has_group {
            continue;
        }
        let client = &instance.client;
        if matches!(action, Action::Stop | Action::Restart) {
            outcome.record(
                &instance.name,
                "stop_process_group",
                client.stop_process_group(group, wait).await,
            );
        }
        if matches!(action, Action::Start | Action::Restart) {
            outcome.record(
                &instance.name,
                "start_process_group",
                client.start_process_group(group, wait).await,
            );
        }
    }
    info!(
        action = action.as_str(),
        group,
        calls = outcome.calls,
        failures = outcome.failures,
        "group action complete"
    );
    outcome
}

pub async fn clear_instance_logs(instance: &Instance) -> Outcome {
    let mut outcome = Outcome::default();
    outcome.record(
        &instance.name,
        "clear_all_process_logs",
        instance.client.clear_all_process_logs().await,
    );
    outcome
}

pub async fn clear_all_logs(instances: &[Instance]) -> Outcome {
    let mut outcome = Outcome::default();
    for instance in instances {
        outcome.merge(clear_instance_logs(instance).await);
    }
    outcome
}

pub async fn clear_process_logs(instance: &Instance, process: &str) -> Outcome {
    let mut outcome = Outcome::default();
    outcome.record(
        &instance.name,
        "clear_process_logs",
        instance.client.clear_process_logs(process).await,
    );
    outcome
}
