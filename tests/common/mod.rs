// Shared test helpers: in-memory supervisord and connector

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use supervisor_monitor::config::InstanceConfig;
use supervisor_monitor::models::{ProcessInfo, ProcessState};
use supervisor_monitor::registry::{Instance, InstanceRegistry};
use supervisor_monitor::supervisor::{LogChunk, RpcError, SupervisorApi, SupervisorConnector};

pub fn process(name: &str, group: &str, state: ProcessState, start: i64) -> ProcessInfo {
    ProcessInfo {
        name: name.to_string(),
        group: group.to_string(),
        state,
        start,
        stop: 0,
        now: start + 60,
        pid: if state == ProcessState::Running { 100 } else { 0 },
        description: String::new(),
        exit_status: 0,
        spawn_error: String::new(),
    }
}

/// One recorded tail request.
#[derive(Debug, Clone)]
pub struct TailCall {
    pub log: &'static str,
    pub process: String,
    pub offset: i64,
    pub length: i64,
    pub at: tokio::time::Instant,
}

#[derive(Default)]
pub struct FakeSupervisor {
    pub connected: AtomicBool,
    pub processes: Mutex<Vec<ProcessInfo>>,
    pub list_fails: AtomicBool,
    /// Operation names (e.g. "stop_process") that answer with a fault.
    pub failing: Mutex<HashSet<String>>,
    /// Every mutating call as "operation" or "operation:arg".
    pub calls: Mutex<Vec<String>>,
    /// Scripted tail answers; once empty, every request returns no new data.
    pub tail_script: Mutex<VecDeque<Result<LogChunk, RpcError>>>,
    pub tail_calls: Mutex<Vec<TailCall>>,
    /// Delay before every tail answer, on the tokio clock.
    pub tail_delay: Mutex<Option<Duration>>,
}

impl FakeSupervisor {
    pub fn online(processes: Vec<ProcessInfo>) -> Arc<Self> {
        let fake = Self::default();
        fake.connected.store(true, Ordering::SeqCst);
        *fake.processes.lock().unwrap() = processes;
        Arc::new(fake)
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, operation: &str) {
        self.failing.lock().unwrap().insert(operation.to_string());
    }

    pub fn push_tail(&self, content: &str, offset: i64, overflow: bool) {
        self.tail_script.lock().unwrap().push_back(Ok(LogChunk {
            content: content.to_string(),
            offset,
            overflow,
        }));
    }

    pub fn slow_tail(&self, delay: Duration) {
        *self.tail_delay.lock().unwrap() = Some(delay);
    }

    pub fn push_tail_error(&self) {
        self.tail_script.lock().unwrap().push_back(Err(RpcError::Fault {
            code: 10,
            message: "BAD_NAME".into(),
        }));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tail_calls(&self) -> Vec<TailCall> {
        self.tail_calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &str, arg: Option<&str>) -> Result<(), RpcError> {
        let entry = match arg {
            Some(a) => format!("{}:{}", operation, a),
            None => operation.to_string(),
        };
        self.calls.lock().unwrap().push(entry);
        if self.failing.lock().unwrap().contains(operation) {
            return Err(RpcError::Fault {
                code: 70,
                message: format!("{} failed", operation),
            });
        }
        Ok(())
    }

    async fn tail(
        &self,
        log: &'static str,
        process: &str,
        offset: i64,
        length: i64,
    ) -> Result<LogChunk, RpcError> {
        self.tail_calls.lock().unwrap().push(TailCall {
            log,
            process: process.to_string(),
            offset,
            length,
            at: tokio::time::Instant::now(),
        });
        let delay = *self.tail_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.tail_script.lock().unwrap().pop_front() {
            Some(answer) => answer,
            None => Ok(LogChunk {
                content: String::new(),
                offset: offset.max(0),
                overflow: false,
            }),
        }
    }
}

#[async_trait]
impl SupervisorApi for FakeSupervisor {
    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn get_all_process_info(&self) -> Result<Vec<ProcessInfo>, RpcError> {
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(RpcError::Parse("listing failed".into()));
        }
        Ok(self.processes.lock().unwrap().clone())
    }

    async fn start_all_processes(&self, _wait: bool) -> Result<(), RpcError> {
        self.record("start_all_processes", None)
    }

    async fn stop_all_processes(&self, _wait: bool) -> Result<(), RpcError> {
        self.record("stop_all_processes", None)
    }

    async fn start_process(&self, name: &str, _wait: bool) -> Result<(), RpcError> {
        self.record("start_process", Some(name))
    }

    async fn stop_process(&self, name: &str, _wait: bool) -> Result<(), RpcError> {
        self.record("stop_process", Some(name))
    }

    async fn start_process_group(&self, group: &str, _wait: bool) -> Result<(), RpcError> {
        self.record("start_process_group", Some(group))
    }

    async fn stop_process_group(&self, group: &str, _wait: bool) -> Result<(), RpcError> {
        self.record("stop_process_group", Some(group))
    }

    async fn clear_all_process_logs(&self) -> Result<(), RpcError> {
        self.record("clear_all_process_logs", None)
    }

    async fn clear_process_logs(&self, name: &str) -> Result<(), RpcError> {
        self.record("clear_process_logs", Some(name))
    }

    async fn tail_process_stdout_log(
        &self,
        name: &str,
        offset: i64,
        length: i64,
    ) -> Result<LogChunk, RpcError> {
        self.tail("stdout", name, offset, length).await
    }

    async fn tail_process_stderr_log(
        &self,
        name: &str,
        offset: i64,
        length: i64,
    ) -> Result<LogChunk, RpcError> {
        self.tail("stderr", name, offset, length).await
    }
}

/// Hands out pre-built fakes by instance name and counts how often each is built.
#[derive(Default)]
pub struct FakeConnector {
    pub fakes: HashMap<String, Arc<FakeSupervisor>>,
    pub connects: Mutex<HashMap<String, usize>>,
    pub total_connects: AtomicUsize,
}

impl FakeConnector {
    pub fn connects_for(&self, name: &str) -> usize {
        self.connects.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

impl SupervisorConnector for FakeConnector {
    fn connect(&self, config: &InstanceConfig) -> Result<Arc<dyn SupervisorApi>, RpcError> {
        self.total_connects.fetch_add(1, Ordering::SeqCst);
        *self
            .connects
            .lock()
            .unwrap()
            .entry(config.name.clone())
            .or_default() += 1;
        let fake = self
            .fakes
            .get(&config.name)
            .cloned()
            .ok_or_else(|| RpcError::Parse(format!("no fake for {}", config.name)))?;
        Ok(fake)
    }
}

pub fn instance_config(name: &str) -> InstanceConfig {
    InstanceConfig {
        name: name.to_string(),
        url: format!("http://{}:9001/RPC2", name),
        username: "user".into(),
        password: "123".into(),
    }
}

/// Registry over `fakes`, configured in the given order.
pub fn registry(
    fakes: &[(&str, Arc<FakeSupervisor>)],
) -> (Arc<InstanceRegistry>, Arc<FakeConnector>) {
    let connector = Arc::new(FakeConnector {
        fakes: fakes
            .iter()
            .map(|(n, f)| (n.to_string(), f.clone()))
            .collect(),
        ..Default::default()
    });
    let configs = fakes.iter().map(|(n, _)| instance_config(n)).collect();
    let registry = Arc::new(InstanceRegistry::new(configs, connector.clone()));
    (registry, connector)
}

pub fn instances(fakes: &[(&str, Arc<FakeSupervisor>)]) -> Vec<Instance> {
    fakes
        .iter()
        .map(|(n, f)| Instance {
            name: n.to_string(),
            client: f.clone(),
        })
        .collect()
}
