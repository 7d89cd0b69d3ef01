use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::test_connection;
use crate::control::{CommandRegistry, DispatchOutcome, Dispatcher, FnHandler, StateTarget};
use crate::error::{Result, SyncError};

type CallLog = Arc<Mutex<Vec<String>>>;

fn recording_dispatcher(names: &[&'static str]) -> (Dispatcher, CallLog) {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let mut registry = CommandRegistry::new();
    for &name in names {
        let log = log.clone();
        registry.register(
            name,
            FnHandler::new(move |_, args| {
                let mut entry = name.to_string();
                for arg in args {
                    entry.push(' ');
                    entry.push_str(arg);
                }
                log.lock().unwrap().push(entry);
            }),
        );
    }
    (Dispatcher::new(registry), log)
}

struct RecordingTarget {
    seen: Mutex<Vec<Map<String, Value>>>,
    reject: bool,
}

#[async_trait]
impl StateTarget for RecordingTarget {
    fn name(&self) -> &str {
        "recording"
    }

    async fn apply_state(&self, doc: &Map<String, Value>) -> Result<()> {
        if self.reject {
            return Err(SyncError::MalformedPayload {
                message: "rejected".to_string(),
            });
        }
        self.seen.lock().unwrap().push(doc.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_multiple_commands_in_order() {
    let (dispatcher, log) = recording_dispatcher(&["load", "play"]);
    let (conn, _rx) = test_connection();

    let outcome = dispatcher.dispatch(&conn, b"load foo.mp4\nplay\n").await;

    assert_eq!(outcome, DispatchOutcome::Commands(2));
    assert_eq!(*log.lock().unwrap(), vec!["load foo.mp4", "play"]);
}

#[tokio::test]
async fn test_whitespace_tokenizing() {
    let (dispatcher, log) = recording_dispatcher(&["volume"]);
    let (conn, _rx) = test_connection();

    dispatcher.dispatch(&conn, b"  volume \t 0.5  \r\n\n").await;

    assert_eq!(*log.lock().unwrap(), vec!["volume 0.5"]);
}

#[tokio::test]
async fn test_names_are_case_sensitive() {
    let (dispatcher, log) = recording_dispatcher(&["play"]);
    let (conn, _rx) = test_connection();

    let outcome = dispatcher.dispatch(&conn, b"PLAY\n").await;

    assert_eq!(outcome, DispatchOutcome::Dropped);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_lines_skipped_when_others_match() {
    let (dispatcher, log) = recording_dispatcher(&["pause"]);
    let (conn, _rx) = test_connection();

    let outcome = dispatcher.dispatch(&conn, b"bogus 1\npause\n").await;

    assert_eq!(outcome, DispatchOutcome::Commands(1));
    assert_eq!(*log.lock().unwrap(), vec!["pause"]);
}

#[tokio::test]
async fn test_state_document_fallback() {
    let (dispatcher, _log) = recording_dispatcher(&["play"]);
    let target = Arc::new(RecordingTarget {
        seen: Mutex::new(Vec::new()),
        reject: false,
    });
    dispatcher.add_target(target.clone()).await;
    let (conn, _rx) = test_connection();

    let outcome = dispatcher
        .dispatch(&conn, br#"{"volume": 0.5, "looping": true}"#)
        .await;

    assert_eq!(outcome, DispatchOutcome::StateApplied(1));
    let seen = target.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["volume"], serde_json::json!(0.5));
}

#[tokio::test]
async fn test_malformed_state_document_is_contained() {
    let (dispatcher, _log) = recording_dispatcher(&[]);
    let target = Arc::new(RecordingTarget {
        seen: Mutex::new(Vec::new()),
        reject: false,
    });
    dispatcher.add_target(target.clone()).await;
    let (conn, _rx) = test_connection();

    let outcome = dispatcher.dispatch(&conn, b"{\"volume\": ").await;

    assert_eq!(outcome, DispatchOutcome::Dropped);
    assert!(target.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rejecting_target_does_not_stop_others() {
    let (dispatcher, _log) = recording_dispatcher(&[]);
    let rejecting = Arc::new(RecordingTarget {
        seen: Mutex::new(Vec::new()),
        reject: true,
    });
    let accepting = Arc::new(RecordingTarget {
        seen: Mutex::new(Vec::new()),
        reject: false,
    });
    dispatcher.add_target(rejecting).await;
    dispatcher.add_target(accepting.clone()).await;
    let (conn, _rx) = test_connection();

    let outcome = dispatcher.dispatch(&conn, br#"{"brightness": 0.2}"#).await;

    assert_eq!(outcome, DispatchOutcome::StateApplied(1));
    assert_eq!(accepting.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_garbage_is_dropped() {
    let (dispatcher, _log) = recording_dispatcher(&["play"]);
    let (conn, _rx) = test_connection();

    assert_eq!(
        dispatcher.dispatch(&conn, b"hello there").await,
        DispatchOutcome::Dropped
    );
    assert_eq!(
        dispatcher.dispatch(&conn, &[0xff, 0xfe, 0x00]).await,
        DispatchOutcome::Dropped
    );
    assert_eq!(dispatcher.dispatch(&conn, b"[1, 2]").await, DispatchOutcome::Dropped);
}

#[tokio::test]
async fn test_handler_reply_reaches_connection() {
    let mut registry = CommandRegistry::new();
    registry.register(
        "echo",
        FnHandler::new(|conn, args| {
            conn.reply(args.join(" "));
        }),
    );
    let dispatcher = Dispatcher::new(registry);
    let (conn, mut rx) = test_connection();

    dispatcher.dispatch(&conn, b"echo ping").await;

    assert_eq!(rx.try_recv().unwrap(), "ping");
}

#[tokio::test]
async fn test_connection_bookkeeping_prunes_closed() {
    let dispatcher = Dispatcher::new(CommandRegistry::new());
    let (first, _rx1) = test_connection();
    let (second, _rx2) = test_connection();

    dispatcher.track(&first).await;
    dispatcher.track(&second).await;
    assert_eq!(dispatcher.open_connections().await.len(), 2);

    first.close();
    let open = dispatcher.open_connections().await;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, second.id());
}
