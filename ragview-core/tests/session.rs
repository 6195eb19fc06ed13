use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::runtime::Handle;

use ragview_core::chat::Role;
use ragview_core::errors::{ClientResult, ErrorKind};
use ragview_core::logs::LogsState;
use ragview_core::refresh::RefreshStatus;
use ragview_core::types::{ChatReply, EvaluationRecord, NodeRef};
use ragview_core::upload::{IngestKind, UploadFile, UNSUPPORTED_FILE_TYPE, UPLOAD_FAILED};
use ragview_core::{BackendHealth, Gateway, Session, SessionEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Health,
    Ingest { file_name: String, endpoint: &'static str },
    Reprocess,
    Chat(String),
    Logs,
}

#[derive(Default)]
struct FakeGateway {
    calls: Mutex<Vec<Call>>,
    fetches: AtomicUsize,
    ingest_status: Option<u16>,
    reprocess_status: Option<u16>,
    chat_node: Option<String>,
    chat_status: Option<u16>,
    logs_status: Option<(u16, String)>,
}

impl FakeGateway {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn fail(status: u16, body: &str) -> ragview_core::ClientError {
        ErrorKind::Status {
            status,
            body: body.to_string(),
        }
        .into()
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn health(&self) -> ClientResult<()> {
        self.record(Call::Health);
        Ok(())
    }

    async fn ingest(&self, file: UploadFile, kind: IngestKind) -> ClientResult<()> {
        self.record(Call::Ingest {
            file_name: file.file_name,
            endpoint: kind.endpoint(),
        });
        match self.ingest_status {
            Some(status) => Err(Self::fail(status, "ingestion failed")),
            None => Ok(()),
        }
    }

    async fn reprocess(&self) -> ClientResult<()> {
        self.record(Call::Reprocess);
        match self.reprocess_status {
            Some(status) => Err(Self::fail(status, "graph build failed")),
            None => Ok(()),
        }
    }

    async fn send_message(&self, text: &str) -> ClientResult<ChatReply> {
        self.record(Call::Chat(text.to_string()));
        if let Some(status) = self.chat_status {
            return Err(Self::fail(status, "Internal Server Error"));
        }
        Ok(ChatReply {
            content: format!("answer to {text}"),
            node: self.chat_node.clone().map(|name| NodeRef { name: Some(name) }),
        })
    }

    async fn fetch_logs(&self) -> ClientResult<Vec<EvaluationRecord>> {
        self.record(Call::Logs);
        let fetch = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((status, body)) = &self.logs_status {
            return Err(Self::fail(*status, body));
        }
        let records = json!([
            {"timestamp": "2024-01-01T00:00:00Z", "query": "q1", "answer": "a1",
             "retrieved_context": "", "evaluation": {"grounded_in_graph": true}},
            {"timestamp": "2024-01-02T00:00:00Z", "query": "q2", "answer": "a2",
             "retrieved_context": {"pokemon": "Squirtle"}, "evaluation": {"latency_ms": 40},
             "focused_pokemon": {"name": "Squirtle"}},
            {"timestamp": "2024-01-03T00:00:00Z", "query": format!("fetch-{fetch}"), "answer": "",
             "retrieved_context": "", "evaluation": {}}
        ]);
        Ok(serde_json::from_value(records)?)
    }
}

fn session(gateway: &Arc<FakeGateway>) -> Session {
    Session::new(Handle::current(), gateway.clone(), Arc::new(|| {}))
}

async fn pump(session: &mut Session) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), session.next_event())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

async fn assert_quiet(session: &mut Session) {
    let next = tokio::time::timeout(Duration::from_millis(100), session.next_event()).await;
    assert!(next.is_err(), "unexpected event: {next:?}");
}

fn fixture(suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("starter")
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(b"fixture bytes").unwrap();
    file
}

#[tokio::test]
async fn unsupported_file_is_rejected_without_network_call() {
    let gateway = Arc::new(FakeGateway::default());
    let mut session = session(&gateway);
    session.open_upload();

    for name in ["team.gif", "notes.docx", "clip.wav", "README"] {
        assert!(!session.select_file(name.into()));
        assert_eq!(session.upload().error(), Some(UNSUPPORTED_FILE_TYPE));
        assert!(session.upload().is_open());
    }
    assert_quiet(&mut session).await;
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn successful_upload_reprocesses_once_and_closes_dialog() {
    let gateway = Arc::new(FakeGateway::default());
    let mut session = session(&gateway);
    let file = fixture(".PNG");

    session.open_upload();
    assert!(session.select_file(file.path().to_path_buf()));
    assert!(session.upload().selection().is_some());

    let event = pump(&mut session).await;
    assert!(matches!(event, SessionEvent::IngestFinished { .. }));
    session.apply(event);
    assert!(!session.upload().is_open());
    assert!(session.refresh().is_syncing());

    let event = pump(&mut session).await;
    assert!(matches!(event, SessionEvent::ReprocessFinished { .. }));
    session.apply(event);
    assert_quiet(&mut session).await;

    let calls = gateway.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[0], Call::Ingest { endpoint: "/add/image", .. }));
    assert_eq!(calls[1], Call::Reprocess);
    assert_eq!(session.refresh().revision(), 1);
    assert_eq!(session.refresh().status(), &RefreshStatus::Succeeded);
    assert_eq!(session.upload().selection(), None);
}

#[tokio::test]
async fn failed_upload_keeps_dialog_open_and_skips_reprocess() {
    let gateway = Arc::new(FakeGateway {
        ingest_status: Some(500),
        ..Default::default()
    });
    let mut session = session(&gateway);
    let file = fixture(".pdf");

    session.open_upload();
    assert!(session.select_file(file.path().to_path_buf()));
    let event = pump(&mut session).await;
    session.apply(event);
    assert_quiet(&mut session).await;

    assert!(session.upload().is_open());
    assert_eq!(session.upload().error(), Some(UPLOAD_FAILED));
    assert_eq!(session.upload().selection(), None);
    assert_eq!(session.refresh().revision(), 0);
    assert!(!gateway.calls().contains(&Call::Reprocess));
}

#[tokio::test]
async fn unreadable_file_is_an_upload_failure() {
    let gateway = Arc::new(FakeGateway::default());
    let mut session = session(&gateway);

    session.open_upload();
    assert!(session.select_file("/no/such/dir/cry.mp3".into()));
    let event = pump(&mut session).await;
    session.apply(event);

    assert_eq!(session.upload().error(), Some(UPLOAD_FAILED));
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn reprocess_failure_still_moves_the_refresh_signal() {
    let gateway = Arc::new(FakeGateway {
        reprocess_status: Some(500),
        ..Default::default()
    });
    let mut session = session(&gateway);
    let file = fixture(".txt");

    session.open_upload();
    session.select_file(file.path().to_path_buf());
    let event = pump(&mut session).await;
    session.apply(event);
    let event = pump(&mut session).await;
    session.apply(event);

    assert!(!session.upload().is_open());
    assert_eq!(session.refresh().revision(), 1);
    assert!(matches!(session.refresh().status(), RefreshStatus::Failed(_)));
    assert!(!session.refresh().is_syncing());
}

#[tokio::test]
async fn chat_success_appends_reply_and_focuses_entity() {
    let gateway = Arc::new(FakeGateway {
        chat_node: Some("Bulbasaur".to_string()),
        ..Default::default()
    });
    let mut session = session(&gateway);

    assert!(session.submit_chat("  tell me about the grass starter "));
    assert_eq!(session.chat().transcript().len(), 1);
    assert!(session.chat().is_waiting());

    let event = pump(&mut session).await;
    session.apply(event);

    let transcript = session.chat().transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, Role::User);
    assert_eq!(transcript[0].text, "tell me about the grass starter");
    assert_eq!(transcript[1].role, Role::Assistant);
    assert_eq!(session.chat().focused_entity(), Some("Bulbasaur"));
    assert_eq!(
        gateway.calls(),
        vec![Call::Chat("tell me about the grass starter".to_string())]
    );
}

#[tokio::test]
async fn chat_without_node_keeps_previous_focus() {
    let gateway = Arc::new(FakeGateway::default());
    let mut session = session(&gateway);

    session.submit_chat("hello");
    let event = pump(&mut session).await;
    session.apply(event);

    assert_eq!(session.chat().transcript().len(), 2);
    assert_eq!(session.chat().focused_entity(), None);
}

#[tokio::test]
async fn chat_server_error_leaves_user_message_unanswered() {
    let gateway = Arc::new(FakeGateway {
        chat_status: Some(500),
        ..Default::default()
    });
    let mut session = session(&gateway);

    session.submit_chat("is anyone there?");
    let event = pump(&mut session).await;
    session.apply(event);

    let transcript = session.chat().transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].text, "is anyone there?");
    assert_eq!(session.chat().focused_entity(), None);
    assert!(!session.chat().is_waiting());
}

#[tokio::test]
async fn empty_chat_input_sends_nothing() {
    let gateway = Arc::new(FakeGateway::default());
    let mut session = session(&gateway);

    assert!(!session.submit_chat(" \t "));
    assert_quiet(&mut session).await;
    assert!(session.chat().transcript().is_empty());
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn logs_are_shown_most_recent_first() {
    let gateway = Arc::new(FakeGateway::default());
    let mut session = session(&gateway);

    session.open_logs();
    assert!(session.logs().is_loading());
    let event = pump(&mut session).await;
    session.apply(event);

    let LogsState::Ready(records) = session.logs().state() else {
        panic!("expected loaded logs, got {:?}", session.logs().state());
    };
    let queries: Vec<&str> = records.iter().map(|r| r.query.as_str()).collect();
    assert_eq!(queries, vec!["fetch-1", "q2", "q1"]);
    assert_eq!(records[1].focused_name(), Some("Squirtle"));
}

#[tokio::test]
async fn logs_failure_surfaces_status_message() {
    let gateway = Arc::new(FakeGateway {
        logs_status: Some((500, String::new())),
        ..Default::default()
    });
    let mut session = session(&gateway);

    session.open_logs();
    let event = pump(&mut session).await;
    session.apply(event);

    assert!(
        matches!(session.logs().state(), LogsState::Failed(msg) if msg == "Failed to load logs (500)")
    );
}

#[tokio::test]
async fn reopening_logs_ignores_the_older_fetch() {
    let gateway = Arc::new(FakeGateway::default());
    let mut session = session(&gateway);

    session.open_logs();
    session.close_logs();
    session.open_logs();
    assert!(session.logs().is_loading());

    for _ in 0..2 {
        let event = pump(&mut session).await;
        session.apply(event);
    }

    let LogsState::Ready(records) = session.logs().state() else {
        panic!("expected loaded logs");
    };
    assert_eq!(records[0].query, "fetch-2");
}

#[tokio::test]
async fn cancelled_upload_still_rebuilds_graph_after_success() {
    let gateway = Arc::new(FakeGateway::default());
    let mut session = session(&gateway);
    let file = fixture(".jpeg");

    session.open_upload();
    session.select_file(file.path().to_path_buf());
    session.cancel_upload();

    let event = pump(&mut session).await;
    session.apply(event);
    assert!(!session.upload().is_open());

    let event = pump(&mut session).await;
    assert!(matches!(event, SessionEvent::ReprocessFinished { .. }));
}

#[tokio::test]
async fn health_check_marks_backend_online() {
    let gateway = Arc::new(FakeGateway::default());
    let mut session = session(&gateway);

    session.check_health();
    assert_eq!(session.health(), &BackendHealth::Unknown);
    let event = pump(&mut session).await;
    session.apply(event);
    assert_eq!(session.health(), &BackendHealth::Online);
}

#[tokio::test]
async fn shutdown_abandons_in_flight_requests() {
    let gateway = Arc::new(FakeGateway::default());
    let mut session = session(&gateway);

    session.shutdown();
    session.submit_chat("too late");
    assert_quiet(&mut session).await;
    assert_eq!(session.chat().transcript().len(), 1);
}
