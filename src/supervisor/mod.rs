// Remote supervisord boundary: the capability trait the core depends on, plus the
// XML-RPC implementation used in production.

mod client;
pub mod xmlrpc;

pub use client::{SupervisorClient, XmlRpcConnector};
pub use xmlrpc::RpcError;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::InstanceConfig;
use crate::models::ProcessInfo;

/// One chunk of a process log as returned by `tailProcess*Log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub content: String,
    /// Offset to use for the next request (the log size on the remote).
    pub offset: i64,
    /// More data is already buffered beyond this chunk.
    pub overflow: bool,
}

/// Everything the dashboard needs from one supervisord instance.
#[async_trait]
pub trait SupervisorApi: Send + Sync {
    /// Reachability check; never an error, an unreachable instance just reports `false`.
    async fn is_connected(&self) -> bool;

    async fn get_all_process_info(&self) -> Result<Vec<ProcessInfo>, RpcError>;

    async fn start_all_processes(&self, wait: bool) -> Result<(), RpcError>;

    async fn stop_all_processes(&self, wait: bool) -> Result<(), RpcError>;

    async fn start_process(&self, name: &str, wait: bool) -> Result<(), RpcError>;

    async fn stop_process(&self, name: &str, wait: bool) -> Result<(), RpcError>;

    async fn start_process_group(&self, group: &str, wait: bool) -> Result<(), RpcError>;

    async fn stop_process_group(&self, group: &str, wait: bool) -> Result<(), RpcError>;

    async fn clear_all_process_logs(&self) -> Result<(), RpcError>;

    async fn clear_process_logs(&self, name: &str) -> Result<(), RpcError>;

    async fn tail_process_stdout_log(
        &self,
        name: &str,
        offset: i64,
        length: i64,
    ) -> Result<LogChunk, RpcError>;

    async fn tail_process_stderr_log(
        &self,
        name: &str,
        offset: i64,
        length: i64,
    ) -> Result<LogChunk, RpcError>;
}

/// Builds a handle for one configured instance. Must not touch the network.
pub trait SupervisorConnector: Send + Sync {
    fn connect(&self, config: &InstanceConfig) -> Result<Arc<dyn SupervisorApi>, RpcError>;
}
