use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::chat::ChatController;
use crate::errors::ClientResult;
use crate::gateway::Gateway;
use crate::logs::LogsDialog;
use crate::refresh::GraphRefresh;
use crate::types::{ChatReply, EvaluationRecord};
use crate::upload::{UploadDialog, UploadEffect, UploadFile};

/// Called after every event is queued so the UI can schedule a redraw.
pub type Notifier = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug)]
pub enum SessionEvent {
    HealthChecked {
        result: ClientResult<()>,
    },
    IngestFinished {
        generation: u64,
        file_name: String,
        result: ClientResult<()>,
    },
    ReprocessFinished {
        request: u64,
        result: ClientResult<()>,
    },
    ChatFinished {
        message_id: u64,
        result: ClientResult<ChatReply>,
    },
    LogsFinished {
        generation: u64,
        result: ClientResult<Vec<EvaluationRecord>>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BackendHealth {
    #[default]
    Unknown,
    Online,
    Offline(String),
}

/// Wires user actions to backend calls and routes the answers back into the
/// controllers. All state is mutated on the caller's thread; network calls run
/// as tasks on `runtime` and report through the event channel.
pub struct Session {
    runtime: Handle,
    gateway: Arc<dyn Gateway>,
    notifier: Notifier,
    token: CancellationToken,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,
    health: BackendHealth,
    upload: UploadDialog,
    chat: ChatController,
    logs: LogsDialog,
    refresh: GraphRefresh,
}

impl Session {
    pub fn new(runtime: Handle, gateway: Arc<dyn Gateway>, notifier: Notifier) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            gateway,
            notifier,
            token: CancellationToken::new(),
            events_tx,
            events_rx,
            health: BackendHealth::default(),
            upload: UploadDialog::default(),
            chat: ChatController::default(),
            logs: LogsDialog::default(),
            refresh: GraphRefresh::default(),
        }
    }

    pub fn health(&self) -> &BackendHealth {
        &self.health
    }

    pub fn upload(&self) -> &UploadDialog {
        &self.upload
    }

    pub fn chat(&self) -> &ChatController {
        &self.chat
    }

    pub fn logs(&self) -> &LogsDialog {
        &self.logs
    }

    pub fn refresh(&self) -> &GraphRefresh {
        &self.refresh
    }

    pub fn check_health(&mut self) {
        self.health = BackendHealth::Unknown;
        let gateway = self.gateway.clone();
        self.spawn(async move {
            SessionEvent::HealthChecked {
                result: gateway.health().await,
            }
        });
    }

    pub fn open_upload(&mut self) {
        self.upload.open();
    }

    pub fn cancel_upload(&mut self) {
        self.upload.cancel();
    }

    /// Starts an ingestion when the file type is supported.
    pub fn select_file(&mut self, path: PathBuf) -> bool {
        let Some(request) = self.upload.select(&path) else {
            return false;
        };
        let gateway = self.gateway.clone();
        self.spawn(async move {
            let result = match UploadFile::read(&request).await {
                Ok(file) => gateway.ingest(file, request.kind.ingest_kind()).await,
                Err(err) => Err(err),
            };
            SessionEvent::IngestFinished {
                generation: request.generation,
                file_name: request.file_name,
                result,
            }
        });
        true
    }

    pub fn update_graph(&mut self) {
        let request = self.refresh.begin();
        let gateway = self.gateway.clone();
        self.spawn(async move {
            SessionEvent::ReprocessFinished {
                request,
                result: gateway.reprocess().await,
            }
        });
    }

    pub fn submit_chat(&mut self, input: &str) -> bool {
        let Some(request) = self.chat.submit(input) else {
            return false;
        };
        let gateway = self.gateway.clone();
        self.spawn(async move {
            SessionEvent::ChatFinished {
                message_id: request.message_id,
                result: gateway.send_message(&request.text).await,
            }
        });
        true
    }

    pub fn open_logs(&mut self) {
        let generation = self.logs.open();
        let gateway = self.gateway.clone();
        self.spawn(async move {
            SessionEvent::LogsFinished {
                generation,
                result: gateway.fetch_logs().await,
            }
        });
    }

    pub fn close_logs(&mut self) {
        self.logs.close();
    }

    /// Applies everything already queued. Returns true when anything changed.
    pub fn drain_events(&mut self) -> bool {
        let mut handled = false;
        while let Ok(event) = self.events_rx.try_recv() {
            handled = true;
            self.apply(event);
        }
        handled
    }

    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::HealthChecked { result } => {
                self.health = match result {
                    Ok(()) => BackendHealth::Online,
                    Err(err) => {
                        tracing::warn!("Backend health check failed: {err}");
                        BackendHealth::Offline(err.to_string())
                    }
                };
            }
            SessionEvent::IngestFinished {
                generation,
                file_name,
                result,
            } => {
                if result.is_ok() {
                    tracing::info!("Ingested {file_name}");
                }
                if self.upload.complete(generation, &result) == UploadEffect::Reprocess {
                    self.update_graph();
                }
            }
            SessionEvent::ReprocessFinished { request, result } => {
                self.refresh.finish(request, &result);
            }
            SessionEvent::ChatFinished { message_id, result } => {
                self.chat.complete(message_id, result);
            }
            SessionEvent::LogsFinished { generation, result } => {
                self.logs.complete(generation, result);
            }
        }
    }

    /// Abandons every in-flight request.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = SessionEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        let notifier = self.notifier.clone();
        let token = self.token.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                event = task => {
                    if tx.send(event).is_ok() {
                        notifier();
                    }
                }
            }
        });
    }
}
