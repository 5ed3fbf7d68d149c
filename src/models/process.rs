// Process models: remote payload, host-tagged record, state enumeration

use serde::{Deserialize, Serialize};
use std::fmt;

/// supervisord process state; serializes to its upper-case state name (e.g. "RUNNING").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Backoff,
    Stopping,
    Exited,
    Fatal,
    #[serde(other)]
    Unknown,
}

impl ProcessState {
    /// Parse from the supervisord `statename` field; anything unrecognised is `Unknown`.
    pub fn from_statename(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "STOPPED" => ProcessState::Stopped,
            "STARTING" => ProcessState::Starting,
            "RUNNING" => ProcessState::Running,
            "BACKOFF" => ProcessState::Backoff,
            "STOPPING" => ProcessState::Stopping,
            "EXITED" => ProcessState::Exited,
            "FATAL" => ProcessState::Fatal,
            _ => ProcessState::Unknown,
        }
    }

    /// Parse from the numeric supervisord `state` code.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ProcessState::Stopped,
            10 => ProcessState::Starting,
            20 => ProcessState::Running,
            30 => ProcessState::Backoff,
            40 => ProcessState::Stopping,
            100 => ProcessState::Exited,
            200 => ProcessState::Fatal,
            _ => ProcessState::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessState::Stopped => "STOPPED",
            ProcessState::Starting => "STARTING",
            ProcessState::Running => "RUNNING",
            ProcessState::Backoff => "BACKOFF",
            ProcessState::Stopping => "STOPPING",
            ProcessState::Exited => "EXITED",
            ProcessState::Fatal => "FATAL",
            ProcessState::Unknown => "UNKNOWN",
        }
    }

    /// States whose relevant timestamp is the stop time rather than the start time.
    pub fn is_down(self) -> bool {
        matches!(
            self,
            ProcessState::Stopped
                | ProcessState::Stopping
                | ProcessState::Exited
                | ProcessState::Fatal
                | ProcessState::Unknown
        )
    }

    /// Display class for the state badge.
    pub fn badge(self) -> &'static str {
        match self {
            ProcessState::Starting | ProcessState::Running => "success",
            ProcessState::Backoff => "warning",
            _ => "danger",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of `supervisor.getAllProcessInfo` as the remote reports it. Carries no host.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub name: String,
    pub group: String,
    pub state: ProcessState,
    pub start: i64,
    pub stop: i64,
    pub now: i64,
    pub pid: i64,
    pub description: String,
    pub exit_status: i64,
    pub spawn_error: String,
}

/// A process as seen through one instance at one point in time, tagged with its host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    pub name: String,
    pub group: String,
    pub host: String,
    pub state: ProcessState,
    pub start: i64,
    pub stop: i64,
    pub now: i64,
    pub pid: i64,
    pub description: String,
    pub exit_status: i64,
    pub spawn_error: String,
}

impl ProcessRecord {
    /// Builds a record from a remote payload. `host` always comes from the caller.
    pub fn from_info(host: &str, info: ProcessInfo) -> Self {
        Self {
            name: info.name,
            group: info.group,
            host: host.to_string(),
            state: info.state,
            start: info.start,
            stop: info.stop,
            now: info.now,
            pid: info.pid,
            description: info.description,
            exit_status: info.exit_status,
            spawn_error: info.spawn_error,
        }
    }

    /// `group:name`, the identifier supervisord expects for per-process calls.
    pub fn qualified_name(&self) -> String {
        if self.group.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.group, self.name)
        }
    }

    /// Timestamp of the last transition relevant to the current state.
    pub fn state_changed_at(&self) -> i64 {
        if self.state.is_down() {
            self.stop
        } else {
            self.start
        }
    }

    /// Seconds since the last transition, measured on the remote clock.
    pub fn since_secs(&self) -> i64 {
        (self.now - self.state_changed_at()).max(0)
    }

    pub fn is_running(&self) -> bool {
        self.state == ProcessState::Running
    }
}

/// `"1 process"`, `"3 processes"`.
pub fn pluralize(count: usize, word: &str) -> String {
    if count == 1 {
        return format!("{} {}", count, word);
    }
    let plural = if word.ends_with('s') || word.ends_with('x') || word.ends_with("sh") {
        format!("{}es", word)
    } else if let Some(stem) = word.strip_suffix('y')
        && !stem.ends_with(['a', 'e', 'i', 'o', 'u'])
    {
        format!("{}ies", stem)
    } else {
        format!("{}s", word)
    };
    format!("{} {}", count, plural)
}

/// Coarse "x ago" rendering for a number of seconds.
pub fn humanize_ago(secs: i64) -> String {
    let secs = secs.max(0);
    let (n, unit) = match secs {
        0..=59 => (secs, "second"),
        60..=3_599 => (secs / 60, "minute"),
        3_600..=86_399 => (secs / 3_600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    format!("{} ago", pluralize(n as usize, unit))
}
