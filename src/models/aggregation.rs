// Merged multi-instance view: records plus per-key counts.

use serde::Serialize;
use std::collections::BTreeMap;

use super::ProcessRecord;

/// Result of one aggregation pass. Index maps are BTreeMaps so keys come out sorted.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub processes: Vec<ProcessRecord>,
    pub counts_by_host: BTreeMap<String, usize>,
    pub counts_by_group: BTreeMap<String, usize>,
    pub counts_by_state: BTreeMap<String, usize>,
    pub unreachable: Vec<String>,
    pub not_running: usize,
}

impl AggregationResult {
    /// Appends one host-tagged record and bumps every index it belongs to.
    pub fn push(&mut self, record: ProcessRecord) {
        *self.counts_by_host.entry(record.host.clone()).or_default() += 1;
        *self.counts_by_group.entry(record.group.clone()).or_default() += 1;
        *self
            .counts_by_state
            .entry(record.state.as_str().to_string())
            .or_default() += 1;
        if !record.is_running() {
            self.not_running += 1;
        }
        self.processes.push(record);
    }

    pub fn total(&self) -> usize {
        self.processes.len()
    }
}
