use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub tail: TailConfig,
    pub monitoring: MonitoringConfig,
    /// Monitored supervisord instances, in display order.
    pub instances: Vec<InstanceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Where mutating routes redirect to once the action completes.
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

fn default_base_path() -> String {
    "/".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorConfig {
    /// Passed to every start/stop call: block until supervisord reports a settled state.
    #[serde(default)]
    pub wait_for_supervisor: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            wait_for_supervisor: false,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TailConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: i64,
    /// Server-side cap on a tail session; unbounded when unset.
    #[serde(default)]
    pub max_session_secs: Option<u64>,
}

fn default_poll_interval_ms() -> u64 {
    300
}

fn default_chunk_size() -> i64 {
    4096
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            chunk_size: default_chunk_size(),
            max_session_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to log app stats (instances, connections, tail sessions) at INFO level.
    pub stats_log_interval_secs: u64,
}

/// One supervisord endpoint. Credentials are never serialized back out.
#[derive(Clone, Deserialize, Serialize)]
pub struct InstanceConfig {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for InstanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceConfig")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.server.base_path.starts_with('/'),
            "server.base_path must start with '/', got {:?}",
            self.server.base_path
        );
        anyhow::ensure!(
            self.supervisor.request_timeout_secs > 0,
            "supervisor.request_timeout_secs must be > 0, got {}",
            self.supervisor.request_timeout_secs
        );
        anyhow::ensure!(
            self.tail.poll_interval_ms > 0,
            "tail.poll_interval_ms must be > 0, got {}",
            self.tail.poll_interval_ms
        );
        anyhow::ensure!(
            self.tail.chunk_size > 0,
            "tail.chunk_size must be > 0, got {}",
            self.tail.chunk_size
        );
        if let Some(max) = self.tail.max_session_secs {
            anyhow::ensure!(max > 0, "tail.max_session_secs must be > 0, got {}", max);
        }
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            !self.instances.is_empty(),
            "instances must list at least one supervisord instance"
        );

        let mut seen = HashSet::new();
        for instance in &self.instances {
            anyhow::ensure!(
                !instance.name.is_empty(),
                "instances[].name must be non-empty"
            );
            anyhow::ensure!(
                seen.insert(instance.name.as_str()),
                "instances[].name must be unique, {:?} appears twice",
                instance.name
            );
            anyhow::ensure!(
                instance.url.starts_with("http://") || instance.url.starts_with("https://"),
                "instances.{}.url must be an http(s) URL, got {:?}",
                instance.name,
                instance.url
            );
        }
        Ok(())
    }
}
