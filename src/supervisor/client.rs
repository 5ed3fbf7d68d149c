// supervisord XML-RPC API mapped onto SupervisorApi

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::xmlrpc::{RpcError, Value, XmlRpcClient};
use super::{LogChunk, SupervisorApi, SupervisorConnector};
use crate::config::InstanceConfig;
use crate::models::{ProcessInfo, ProcessState};

/// supervisord reports `statecode == 1` while it is RUNNING.
const SUPERVISOR_RUNNING: i64 = 1;

pub struct SupervisorClient {
    instance: String,
    rpc: XmlRpcClient,
}

impl SupervisorClient {
    pub fn new(config: &InstanceConfig, timeout: Duration) -> Result<Self, RpcError> {
        let rpc = XmlRpcClient::new(&config.url, &config.username, &config.password, timeout)?;
        Ok(Self {
            instance: config.name.clone(),
            rpc,
        })
    }

    async fn call_unit(&self, method: &str, params: &[Value]) -> Result<(), RpcError> {
        self.rpc.call(method, params).await.map(|_| ())
    }

    async fn tail(
        &self,
        method: &str,
        name: &str,
        offset: i64,
        length: i64,
    ) -> Result<LogChunk, RpcError> {
        let v = self
            .rpc
            .call(
                method,
                &[Value::from(name), Value::from(offset), Value::from(length)],
            )
            .await?;
        parse_log_chunk(&v)
    }
}

fn parse_log_chunk(v: &Value) -> Result<LogChunk, RpcError> {
    match v.as_array() {
        Some([content, offset, overflow]) => Ok(LogChunk {
            content: content.as_str().unwrap_or_default().to_string(),
            offset: offset
                .as_i64()
                .ok_or_else(|| RpcError::Parse("tail offset is not an int".into()))?,
            overflow: overflow.as_bool().unwrap_or(false),
        }),
        _ => Err(RpcError::Parse(format!(
            "tail result must be [string, int, bool], got {:?}",
            v
        ))),
    }
}

fn parse_process_info(v: &Value) -> Result<ProcessInfo, RpcError> {
    let str_field = |k: &str| v.get(k).and_then(Value::as_str).unwrap_or_default().to_string();
    let int_field = |k: &str| v.get(k).and_then(Value::as_i64).unwrap_or(0);

    let name = v
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::Parse("process info without a name".into()))?
        .to_string();
    let state = match v.get("statename").and_then(Value::as_str) {
        Some(s) => ProcessState::from_statename(s),
        None => ProcessState::from_code(int_field("state")),
    };
    Ok(ProcessInfo {
        name,
        group: str_field("group"),
        state,
        start: int_field("start"),
        stop: int_field("stop"),
        now: int_field("now"),
        pid: int_field("pid"),
        description: str_field("description"),
        exit_status: int_field("exitstatus"),
        spawn_error: str_field("spawnerr"),
    })
}

#[async_trait]
impl SupervisorApi for SupervisorClient {
    #[instrument(skip(self), fields(instance = %self.instance, operation = "get_state"))]
    async fn is_connected(&self) -> bool {
        match self.rpc.call("supervisor.getState", &[]).await {
            Ok(v) => v.get("statecode").and_then(Value::as_i64) == Some(SUPERVISOR_RUNNING),
            Err(e) => {
                debug!(error = %e, "instance not reachable");
                false
            }
        }
    }

    #[instrument(skip(self), fields(instance = %self.instance, operation = "get_all_process_info"))]
    async fn get_all_process_info(&self) -> Result<Vec<ProcessInfo>, RpcError> {
        let v = self.rpc.call("supervisor.getAllProcessInfo", &[]).await?;
        v.as_array()
            .ok_or_else(|| RpcError::Parse("getAllProcessInfo did not return an array".into()))?
            .iter()
            .map(parse_process_info)
            .collect()
    }

    async fn start_all_processes(&self, wait: bool) -> Result<(), RpcError> {
        self.call_unit("supervisor.startAllProcesses", &[Value::from(wait)])
            .await
    }

    async fn stop_all_processes(&self, wait: bool) -> Result<(), RpcError> {
        self.call_unit("supervisor.stopAllProcesses", &[Value::from(wait)])
            .await
    }

    async fn start_process(&self, name: &str, wait: bool) -> Result<(), RpcError> {
        self.call_unit(
            "supervisor.startProcess",
            &[Value::from(name), Value::from(wait)],
        )
        .await
    }

    async fn stop_process(&self, name: &str, wait: bool) -> Result<(), RpcError> {
        self.call_unit(
            "supervisor.stopProcess",
            &[Value::from(name), Value::from(wait)],
        )
        .await
    }

    async fn start_process_group(&self, group: &str, wait: bool) -> Result<(), RpcError> {
        self.call_unit(
            "supervisor.startProcessGroup",
            &[Value::from(group), Value::from(wait)],
        )
        .await
    }

    async fn stop_process_group(&self, group: &str, wait: bool) -> Result<(), RpcError> {
        self.call_unit(
            "supervisor.stopProcessGroup",
            &[Value::from(group), Value::from(wait)],
        )
        .await
    }

    async fn clear_all_process_logs(&self) -> Result<(), RpcError> {
        self.call_unit("supervisor.clearAllProcessLogs", &[]).await
    }

    async fn clear_process_logs(&self, name: &str) -> Result<(), RpcError> {
        self.call_unit("supervisor.clearProcessLogs", &[Value::from(name)])
            .await
    }

    async fn tail_process_stdout_log(
        &self,
        name: &str,
        offset: i64,
        length: i64,
    ) -> Result<LogChunk, RpcError> {
        self.tail("supervisor.tailProcessStdoutLog", name, offset, length)
            .await
    }

    async fn tail_process_stderr_log(
        &self,
        name: &str,
        offset: i64,
        length: i64,
    ) -> Result<LogChunk, RpcError> {
        self.tail("supervisor.tailProcessStderrLog", name, offset, length)
            .await
    }
}

/// Production connector: one XML-RPC client per instance, sharing a request timeout.
pub struct XmlRpcConnector {
    timeout: Duration,
}

impl XmlRpcConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl SupervisorConnector for XmlRpcConnector {
    fn connect(&self, config: &InstanceConfig) -> Result<Arc<dyn SupervisorApi>, RpcError> {
        Ok(Arc::new(SupervisorClient::new(config, self.timeout)?))
    }
}
