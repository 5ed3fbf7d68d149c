// Errors surfaced by the dashboard core

use crate::supervisor::RpcError;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Supervisor instance \"{0}\" cannot be found")]
    UnknownInstance(String),

    #[error("Log type \"{0}\" not supported")]
    UnsupportedLogType(String),

    #[error("instance \"{instance}\": {source}")]
    Remote {
        instance: String,
        #[source]
        source: RpcError,
    },
}

impl MonitorError {
    pub fn remote(instance: &str, source: RpcError) -> Self {
        MonitorError::Remote {
            instance: instance.to_string(),
            source,
        }
    }
}
