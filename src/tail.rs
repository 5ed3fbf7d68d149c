// Live tail of a process log: a polling loop against one instance that forwards only
// newly appended bytes to a streaming HTTP body until the client goes away.

use bytes::Bytes;
use quick_xml::escape::escape;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::TailConfig;
use crate::error::MonitorError;
use crate::supervisor::{LogChunk, RpcError, SupervisorApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Stdout,
    Stderr,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::Stdout => "stdout",
            LogKind::Stderr => "stderr",
        }
    }

    /// Reads one chunk of this log from `client`.
    pub async fn fetch(
        self,
        client: &dyn SupervisorApi,
        process: &str,
        offset: i64,
        length: i64,
    ) -> Result<LogChunk, RpcError> {
        match self {
            LogKind::Stdout => client.tail_process_stdout_log(process, offset, length).await,
            LogKind::Stderr => client.tail_process_stderr_log(process, offset, length).await,
        }
    }
}

impl FromStr for LogKind {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("stdout") {
            Ok(LogKind::Stdout)
        } else if s.eq_ignore_ascii_case("stderr") {
            Ok(LogKind::Stderr)
        } else {
            Err(MonitorError::UnsupportedLogType(s.to_string()))
        }
    }
}

/// Read position in a remote log.
///
/// A negative `offset` addresses the last `-offset` bytes; a non-negative one is an
/// absolute position. The remote answers every request with a window of up to
/// `chunk_size` bytes that ends at the log's current size, so the cursor has to cut
/// that window down to what was appended since the previous request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailCursor {
    pub offset: i64,
    pub chunk_size: i64,
    pub overflow: bool,
}

impl TailCursor {
    /// Starts at "the last `chunk_size` bytes".
    pub fn new(chunk_size: i64) -> Self {
        Self {
            offset: -chunk_size,
            chunk_size,
            overflow: false,
        }
    }

    /// Consumes the answer to a request made at the current offset and returns the text
    /// that is new to the client, if any.
    pub fn advance(&mut self, chunk: LogChunk) -> Option<String> {
        let requested = self.offset;
        self.offset = chunk.offset;
        self.overflow = chunk.overflow;

        if chunk.content.is_empty() {
            return None;
        }
        if requested < 0 {
            return Some(chunk.content);
        }
        let fresh = chunk.offset - requested;
        if fresh <= 0 {
            return None;
        }
        // A cut inside a multi-byte character moves forward to the next boundary.
        let content = chunk.content;
        let mut start = content.len().saturating_sub(fresh as usize);
        while !content.is_char_boundary(start) {
            start += 1;
        }
        let text = &content[start..];
        if text.is_empty() {
            return None;
        }
        Some(text.to_string())
    }
}

/// HTML-escapes log text and marks every line break with `<br />`.
pub fn to_display(text: &str) -> String {
    escape(text).replace("\r\n", "\n").replace('\n', "<br />\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailSettings {
    pub poll_interval: Duration,
    pub chunk_size: i64,
    pub max_session: Option<Duration>,
}

impl From<&TailConfig> for TailSettings {
    fn from(c: &TailConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(c.poll_interval_ms),
            chunk_size: c.chunk_size,
            max_session: c.max_session_secs.map(Duration::from_secs),
        }
    }
}

impl Default for TailSettings {
    fn default() -> Self {
        (&TailConfig::default()).into()
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailExit {
    Disconnected,
    Failed,
    Expired,
}

/// One streaming session for `instance/process`'s `kind` log.
pub struct TailSession {
    pub client: Arc<dyn SupervisorApi>,
    pub instance: String,
    pub process: String,
    pub kind: LogKind,
    pub settings: TailSettings,
}

impl TailSession {
    /// First fragment, sent before any log data is known so the client sees the response open.
    pub fn opening(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{} / {} ({})</title></head>\n<body style=\"font-family: monospace\">\n",
            escape(self.instance.as_str()),
            escape(self.process.as_str()),
            self.kind.as_str()
        )
    }

    /// Runs until the receiving side of `tx` is dropped, a remote call fails, or the
    /// optional session limit passes. Fragments already sent are never retracted.
    pub async fn run(self, tx: mpsc::Sender<Bytes>) -> TailExit {
        let exit = self.poll(&tx).await;
        match exit {
            TailExit::Disconnected => debug!(
                instance = %self.instance,
                process = %self.process,
                log = self.kind.as_str(),
                "tail client disconnected"
            ),
            TailExit::Expired => info!(
                instance = %self.instance,
                process = %self.process,
                log = self.kind.as_str(),
                "tail session reached its time limit"
            ),
            TailExit::Failed => {}
        }
        exit
    }

    async fn poll(&self, tx: &mpsc::Sender<Bytes>) -> TailExit {
        if tx.send(Bytes::from(self.opening())).await.is_err() {
            return TailExit::Disconnected;
        }

        let deadline = self.settings.max_session.map(|d| Instant::now() + d);
        let mut cursor = TailCursor::new(self.settings.chunk_size);

        loop {
            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                return TailExit::Expired;
            }

            tokio::select! {
                _ = tx.closed() => return TailExit::Disconnected,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }

            // Drain everything the remote already has buffered before sleeping again.
            loop {
                let fetched = tokio::select! {
                    _ = tx.closed() => return TailExit::Disconnected,
                    r = self.kind.fetch(
                        self.client.as_ref(),
                        &self.process,
                        cursor.offset,
                        cursor.chunk_size,
                    ) => r,
                };
                let chunk = match fetched {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(
                            instance = %self.instance,
                            process = %self.process,
                            log = self.kind.as_str(),
                            error = %e,
                            operation = "tail_process_log",
                            "tail session ended by remote error"
                        );
                        return TailExit::Failed;
                    }
                };
                let Some(text) = cursor.advance(chunk) else {
                    // Overflow without new text would spin; wait for the next poll instead.
                    break;
                };
                if tx.send(Bytes::from(to_display(&text))).await.is_err() {
                    return TailExit::Disconnected;
                }
                if !cursor.overflow {
                    break;
                }
            }
        }
    }
}

/// Spawns `session` on its own task and returns the receiving end of its fragment stream.
/// Dropping the receiver cancels the session at its next checkpoint.
pub fn spawn(session: TailSession) -> (mpsc::Receiver<Bytes>, tokio::task::JoinHandle<TailExit>) {
    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(session.run(tx));
    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_kind_parses_case_insensitively() {
        assert_eq!("stdout".parse::<LogKind>().unwrap(), LogKind::Stdout);
        assert_eq!("Stderr".parse::<LogKind>().unwrap(), LogKind::Stderr);
        assert!(matches!(
            "syslog".parse::<LogKind>(),
            Err(MonitorError::UnsupportedLogType(s)) if s == "syslog"
        ));
    }

    #[test]
    fn to_display_escapes_and_breaks_lines() {
        assert_eq!(to_display("a<b\r\nc\n"), "a&lt;b<br />\nc<br />\n");
        assert_eq!(to_display("no newline"), "no newline");
    }

    #[test]
    fn cursor_ignores_window_without_growth() {
        let mut cursor = TailCursor {
            offset: 150,
            chunk_size: 4096,
            overflow: false,
        };
        let out = cursor.advance(LogChunk {
            content: "old tail".into(),
            offset: 150,
            overflow: false,
        });
        assert_eq!(out, None);
        assert_eq!(cursor.offset, 150);
    }

    #[test]
    fn cursor_cut_never_splits_a_character() {
        let mut cursor = TailCursor {
            offset: 10,
            chunk_size: 4096,
            overflow: false,
        };
        // "é" is two bytes; one fresh byte lands inside it.
        let out = cursor.advance(LogChunk {
            content: "xé".into(),
            offset: 11,
            overflow: false,
        });
        assert_eq!(out, None);
        let out = cursor.advance(LogChunk {
            content: "aé".into(),
            offset: 13,
            overflow: false,
        });
        assert_eq!(out.as_deref(), Some("é"));
    }

    #[test]
    fn cursor_returns_whole_window_when_growth_exceeds_it() {
        let mut cursor = TailCursor {
            offset: 0,
            chunk_size: 4,
            overflow: false,
        };
        let out = cursor.advance(LogChunk {
            content: "wxyz".into(),
            offset: 10,
            overflow: true,
        });
        assert_eq!(out.as_deref(), Some("wxyz"));
        assert!(cursor.overflow);
    }
}
