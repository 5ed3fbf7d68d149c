// Instance registry: configured supervisord instances and their lazily built handles.
//
// Lock discipline: the handle cache sits behind a std RwLock. Lookups take the read
// lock; first construction takes the write lock and re-checks the entry before
// building, so concurrent first access to one name builds exactly one handle.
// Construction never does I/O, so the write lock is never held across an await.
// Entries are never removed.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::config::InstanceConfig;
use crate::error::MonitorError;
use crate::supervisor::{SupervisorApi, SupervisorConnector};

/// A resolved instance: its configured name and shared handle.
#[derive(Clone)]
pub struct Instance {
    pub name: String,
    pub client: Arc<dyn SupervisorApi>,
}

pub struct InstanceRegistry {
    configs: Vec<InstanceConfig>,
    connector: Arc<dyn SupervisorConnector>,
    cache: RwLock<HashMap<String, Arc<dyn SupervisorApi>>>,
}

impl InstanceRegistry {
    pub fn new(configs: Vec<InstanceConfig>, connector: Arc<dyn SupervisorConnector>) -> Self {
        Self {
            configs,
            connector,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Cached handle for `name`, building it on first access.
    pub fn get(&self, name: &str) -> Result<Arc<dyn SupervisorApi>, MonitorError> {
        if let Some(client) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(client.clone());
        }

        let config = self
            .configs
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| MonitorError::UnknownInstance(name.to_string()))?;

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = cache.get(name) {
            return Ok(client.clone());
        }
        let client = self
            .connector
            .connect(config)
            .map_err(|e| MonitorError::remote(name, e))?;
        debug!(instance = name, url = %config.url, "supervisor handle created");
        cache.insert(name.to_string(), client.clone());
        Ok(client)
    }

    /// Every configured instance, resolved, in configuration order.
    pub fn get_all(&self) -> Result<Vec<Instance>, MonitorError> {
        self.configs
            .iter()
            .map(|c| {
                Ok(Instance {
                    name: c.name.clone(),
                    client: self.get(&c.name)?,
                })
            })
            .collect()
    }

    pub fn configs(&self) -> &[InstanceConfig] {
        &self.configs
    }

    /// Number of configured instances.
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Number of handles built so far.
    pub fn connected_count(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
