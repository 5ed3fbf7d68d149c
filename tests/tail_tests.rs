// Tail cursor arithmetic and session lifecycle (paused clock)

mod common;

use common::FakeSupervisor;
use std::sync::Arc;
use std::time::Duration;
use supervisor_monitor::supervisor::LogChunk;
use supervisor_monitor::tail::{self, LogKind, TailCursor, TailExit, TailSession, TailSettings};

fn chunk(content: &str, offset: i64, overflow: bool) -> LogChunk {
    LogChunk {
        content: content.into(),
        offset,
        overflow,
    }
}

fn settings() -> TailSettings {
    TailSettings {
        poll_interval: Duration::from_millis(300),
        chunk_size: 4096,
        max_session: None,
    }
}

fn session(fake: &Arc<FakeSupervisor>, kind: LogKind, settings: TailSettings) -> TailSession {
    TailSession {
        client: fake.clone(),
        instance: "web-1".into(),
        process: "app:nginx".into(),
        kind,
        settings,
    }
}

fn text(bytes: &bytes::Bytes) -> String {
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[test]
fn test_first_answer_is_forwarded_whole() {
    let mut cursor = TailCursor::new(4096);
    assert_eq!(cursor.offset, -4096);
    let out = cursor.advance(chunk("abc", 3, false));
    assert_eq!(out.as_deref(), Some("abc"));
    assert_eq!(cursor.offset, 3);
}

#[test]
fn test_only_appended_bytes_are_forwarded() {
    let mut cursor = TailCursor {
        offset: 100,
        chunk_size: 4096,
        overflow: false,
    };
    let window = format!("{}{}", "x".repeat(4046), "y".repeat(50));
    let out = cursor.advance(chunk(&window, 150, false)).unwrap();
    assert_eq!(out, "y".repeat(50));
    assert_eq!(cursor.offset, 150);
}

#[test]
fn test_empty_answer_forwards_nothing() {
    let mut cursor = TailCursor::new(4096);
    assert_eq!(cursor.advance(chunk("", 0, false)), None);
    assert_eq!(cursor.offset, 0);
}

#[test]
fn test_settings_from_config() {
    let config = supervisor_monitor::config::TailConfig {
        poll_interval_ms: 500,
        chunk_size: 1024,
        max_session_secs: Some(60),
    };
    let settings = TailSettings::from(&config);
    assert_eq!(settings.poll_interval, Duration::from_millis(500));
    assert_eq!(settings.chunk_size, 1024);
    assert_eq!(settings.max_session, Some(Duration::from_secs(60)));
}

#[tokio::test(start_paused = true)]
async fn test_session_sends_opening_then_new_text() {
    let fake = FakeSupervisor::online(vec![]);
    fake.push_tail("line 1\n", 7, false);
    fake.push_tail("line 1\n", 7, false);
    fake.push_tail("line 1\n<b>2</b>\n", 16, false);

    let (mut rx, handle) = tail::spawn(session(&fake, LogKind::Stdout, settings()));

    let opening = text(&rx.recv().await.unwrap());
    assert!(opening.contains("<body"));
    assert!(opening.contains("web-1 / app:nginx (stdout)"));
    assert_eq!(text(&rx.recv().await.unwrap()), "line 1<br />\n");
    assert_eq!(
        text(&rx.recv().await.unwrap()),
        "&lt;b&gt;2&lt;/b&gt;<br />\n"
    );

    drop(rx);
    assert_eq!(handle.await.unwrap(), TailExit::Disconnected);

    let calls = fake.tail_calls();
    assert!(calls.iter().all(|c| c.log == "stdout" && c.process == "app:nginx"));
    assert_eq!(calls[0].offset, -4096);
    assert_eq!(calls[0].length, 4096);
    assert_eq!(calls[1].offset, 7);
    assert_eq!(calls[2].offset, 7);
}

#[tokio::test(start_paused = true)]
async fn test_overflow_drains_without_sleeping() {
    let fake = FakeSupervisor::online(vec![]);
    fake.push_tail("aaaa", 10, true);
    fake.push_tail("bbbb", 14, false);

    let settings = TailSettings {
        chunk_size: 4,
        ..settings()
    };
    let (mut rx, _handle) = tail::spawn(session(&fake, LogKind::Stdout, settings));
    rx.recv().await.unwrap();
    assert_eq!(text(&rx.recv().await.unwrap()), "aaaa");
    assert_eq!(text(&rx.recv().await.unwrap()), "bbbb");

    tokio::time::sleep(Duration::from_millis(350)).await;
    let calls = fake.tail_calls();
    assert!(calls.len() >= 3);
    assert_eq!(calls[1].offset, 10);
    assert_eq!(calls[1].at, calls[0].at);
    assert!(calls[2].at - calls[1].at >= Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_session_stops_within_one_interval_of_disconnect() {
    let fake = FakeSupervisor::online(vec![]);
    let (mut rx, handle) = tail::spawn(session(&fake, LogKind::Stdout, settings()));
    rx.recv().await.unwrap();
    drop(rx);

    let exit = tokio::time::timeout(Duration::from_millis(300), handle)
        .await
        .expect("session outlived its client")
        .unwrap();
    assert_eq!(exit, TailExit::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_during_sleep_makes_no_further_remote_call() {
    let fake = FakeSupervisor::online(vec![]);
    fake.slow_tail(Duration::from_secs(5));
    let (mut rx, handle) = tail::spawn(session(&fake, LogKind::Stdout, settings()));
    rx.recv().await.unwrap();

    let dropped_at = tokio::time::Instant::now();
    drop(rx);
    let exit = tokio::time::timeout(Duration::from_millis(300), handle)
        .await
        .expect("session outlived its client")
        .unwrap();
    assert_eq!(exit, TailExit::Disconnected);
    assert!(tokio::time::Instant::now() - dropped_at <= Duration::from_millis(300));
    assert!(fake.tail_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_during_slow_remote_call_ends_session() {
    let fake = FakeSupervisor::online(vec![]);
    fake.slow_tail(Duration::from_secs(5));
    let (mut rx, handle) = tail::spawn(session(&fake, LogKind::Stdout, settings()));
    rx.recv().await.unwrap();

    // The first remote call starts at 300ms and is still pending at 400ms.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(fake.tail_calls().len(), 1);

    let dropped_at = tokio::time::Instant::now();
    drop(rx);
    let exit = tokio::time::timeout(Duration::from_millis(300), handle)
        .await
        .expect("session waited for the remote after its client left")
        .unwrap();
    assert_eq!(exit, TailExit::Disconnected);
    assert!(tokio::time::Instant::now() - dropped_at < Duration::from_secs(5));
    assert_eq!(fake.tail_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_overflow_without_text_waits_for_next_poll() {
    let fake = FakeSupervisor::online(vec![]);
    fake.push_tail("", 10, true);
    fake.push_tail("x", 11, false);

    let (mut rx, _handle) = tail::spawn(session(&fake, LogKind::Stdout, settings()));
    rx.recv().await.unwrap();
    assert_eq!(text(&rx.recv().await.unwrap()), "x");

    let calls = fake.tail_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].offset, 10);
    assert!(calls[1].at - calls[0].at >= Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_remote_error_ends_session_after_delivered_text() {
    let fake = FakeSupervisor::online(vec![]);
    fake.push_tail("hello\n", 6, false);
    fake.push_tail_error();

    let (mut rx, handle) = tail::spawn(session(&fake, LogKind::Stderr, settings()));
    rx.recv().await.unwrap();
    assert_eq!(text(&rx.recv().await.unwrap()), "hello<br />\n");
    assert_eq!(handle.await.unwrap(), TailExit::Failed);
    assert!(rx.recv().await.is_none());
    assert!(fake.tail_calls().iter().all(|c| c.log == "stderr"));
}

#[tokio::test(start_paused = true)]
async fn test_session_limit_expires() {
    let fake = FakeSupervisor::online(vec![]);
    let settings = TailSettings {
        max_session: Some(Duration::from_secs(1)),
        ..settings()
    };
    let (mut rx, handle) = tail::spawn(session(&fake, LogKind::Stdout, settings));
    rx.recv().await.unwrap();

    let exit = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, TailExit::Expired);
    drop(rx);
}

#[test]
fn test_opening_escapes_names() {
    let fake = FakeSupervisor::online(vec![]);
    let mut s = session(&fake, LogKind::Stderr, TailSettings::default());
    s.instance = "a<b".into();
    assert!(s.opening().contains("a&lt;b / app:nginx (stderr)"));
}
