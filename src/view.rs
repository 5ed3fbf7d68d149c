// Filtering, sorting and the JSON dashboard view built on top of an aggregation pass.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{AggregationResult, ProcessRecord, humanize_ago, pluralize};

/// Filter value that matches everything.
pub const ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey {
    Group,
    Host,
    State,
    Name,
}

impl FilterKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "group" => Some(FilterKey::Group),
            "host" => Some(FilterKey::Host),
            "state" => Some(FilterKey::State),
            "name" => Some(FilterKey::Name),
            _ => None,
        }
    }

    fn field(self, record: &ProcessRecord) -> &str {
        match self {
            FilterKey::Group => &record.group,
            FilterKey::Host => &record.host,
            FilterKey::State => record.state.as_str(),
            FilterKey::Name => &record.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Group,
    Host,
    State,
    Start,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "group" => Some(SortKey::Group),
            "host" => Some(SortKey::Host),
            "state" => Some(SortKey::State),
            "start" => Some(SortKey::Start),
            _ => None,
        }
    }

    /// Three-way comparison. States order by their name.
    pub fn compare(self, a: &ProcessRecord, b: &ProcessRecord) -> Ordering {
        match self {
            SortKey::Group => a.group.cmp(&b.group),
            SortKey::Host => a.host.cmp(&b.host),
            SortKey::State => a.state.as_str().cmp(b.state.as_str()),
            SortKey::Start => a.start.cmp(&b.start),
        }
    }
}

/// Records whose `key` field equals `value`; `value == "all"` keeps everything and an
/// unknown key matches nothing.
pub fn filter(records: &[ProcessRecord], key: &str, value: &str) -> Vec<ProcessRecord> {
    if value == ALL {
        return records.to_vec();
    }
    match FilterKey::parse(key) {
        Some(key) => filter_by(records, key, value),
        None => Vec::new(),
    }
}

pub fn filter_by(records: &[ProcessRecord], key: FilterKey, value: &str) -> Vec<ProcessRecord> {
    if value == ALL {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| key.field(r) == value)
        .cloned()
        .collect()
}

/// Stable sort into a new vector; an unknown key keeps the input order.
pub fn sort(records: &[ProcessRecord], key: &str) -> Vec<ProcessRecord> {
    match SortKey::parse(key) {
        Some(key) => sort_by(records, key),
        None => records.to_vec(),
    }
}

pub fn sort_by(records: &[ProcessRecord], key: SortKey) -> Vec<ProcessRecord> {
    let mut out = records.to_vec();
    out.sort_by(|a, b| key.compare(a, b));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Grid,
    List,
    Dashboard,
    Global,
}

impl Layout {
    /// Unknown or missing layouts fall back to `grid`.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("list") => Layout::List,
            Some("dashboard") => Layout::Dashboard,
            Some("global") => Layout::Global,
            _ => Layout::Grid,
        }
    }
}

/// Query string of the dashboard route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    pub layout: Option<String>,
    pub filter: Option<String>,
    pub filter_value: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessView {
    #[serde(flatten)]
    pub record: ProcessRecord,
    pub qualified_name: String,
    pub badge: &'static str,
    pub since_secs: i64,
    pub state_ago: String,
}

impl From<ProcessRecord> for ProcessView {
    fn from(record: ProcessRecord) -> Self {
        let since_secs = record.since_secs();
        Self {
            qualified_name: record.qualified_name(),
            badge: record.state.badge(),
            since_secs,
            state_ago: humanize_ago(since_secs),
            record,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub title: String,
    pub summary: String,
    pub processes: Vec<ProcessView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub not_running: usize,
    pub text: String,
    pub counts_by_host: BTreeMap<String, usize>,
    pub counts_by_group: BTreeMap<String, usize>,
    pub counts_by_state: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub layout: Layout,
    pub filter: Option<String>,
    pub filter_value: String,
    pub sort: Option<String>,
    pub base_url: String,
    pub summary: Summary,
    pub unreachable: Vec<String>,
    pub sections: Vec<Section>,
}

/// Applies the query's filter and sort to `result` and lays the records out in sections.
/// Summary counts always describe the unfiltered aggregation.
pub fn build_view(result: AggregationResult, query: &ViewQuery, base_url: &str) -> DashboardView {
    let layout = Layout::parse(query.layout.as_deref());
    let filter_value = query.filter_value.clone().unwrap_or_else(|| ALL.to_string());

    let mut records = match query.filter.as_deref() {
        Some(key) => filter(&result.processes, key, &filter_value),
        None => result.processes.clone(),
    };
    if let Some(key) = query.sort.as_deref() {
        records = sort(&records, key);
    }

    let sections = match layout {
        Layout::Grid | Layout::List => sections_by(records, |r| r.host.clone()),
        Layout::Global => sections_by(records, |r| r.group.clone()),
        Layout::Dashboard => vec![section(ALL.to_string(), records)],
    };

    DashboardView {
        layout,
        filter: query.filter.clone(),
        filter_value,
        sort: query.sort.clone(),
        base_url: base_url.to_string(),
        summary: Summary {
            total: result.total(),
            not_running: result.not_running,
            text: pluralize(result.total(), "process"),
            counts_by_host: result.counts_by_host,
            counts_by_group: result.counts_by_group,
            counts_by_state: result.counts_by_state,
        },
        unreachable: result.unreachable,
        sections,
    }
}

// Sections come out in ascending key order; records keep their (sorted) order inside.
fn sections_by(
    records: Vec<ProcessRecord>,
    key: impl Fn(&ProcessRecord) -> String,
) -> Vec<Section> {
    let mut grouped: BTreeMap<String, Vec<ProcessRecord>> = BTreeMap::new();
    for r in records {
        grouped.entry(key(&r)).or_default().push(r);
    }
    grouped
        .into_iter()
        .map(|(title, records)| section(title, records))
        .collect()
}

fn section(title: String, records: Vec<ProcessRecord>) -> Section {
    Section {
        summary: pluralize(records.len(), "process"),
        title,
        processes: records.into_iter().map(ProcessView::from).collect(),
    }
}
