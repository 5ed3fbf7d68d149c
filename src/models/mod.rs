// Domain models

mod aggregation;
mod process;

pub use aggregation::AggregationResult;
pub use process::{ProcessInfo, ProcessRecord, ProcessState, humanize_ago, pluralize};
