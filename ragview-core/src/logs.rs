use crate::errors::{ClientError, ClientResult, ErrorKind};
use crate::types::EvaluationRecord;

#[derive(Debug, Clone, Default)]
pub enum LogsState {
    #[default]
    Closed,
    Loading,
    Ready(Vec<EvaluationRecord>),
    Failed(String),
}

/// Evaluation log dialog. Every open starts a fresh fetch.
#[derive(Debug, Default)]
pub struct LogsDialog {
    state: LogsState,
    generation: u64,
}

impl LogsDialog {
    pub fn state(&self) -> &LogsState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, LogsState::Closed)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LogsState::Loading)
    }

    /// Returns the generation the fetch must report back with.
    pub fn open(&mut self) -> u64 {
        self.generation += 1;
        self.state = LogsState::Loading;
        self.generation
    }

    pub fn close(&mut self) {
        self.generation += 1;
        self.state = LogsState::Closed;
    }

    /// Returns false when the result belongs to a superseded open.
    pub fn complete(
        &mut self,
        generation: u64,
        result: ClientResult<Vec<EvaluationRecord>>,
    ) -> bool {
        if generation != self.generation || !self.is_open() {
            tracing::debug!("Dropping stale logs response (generation {generation})");
            return false;
        }
        self.state = match result {
            Ok(mut records) => {
                records.reverse();
                LogsState::Ready(records)
            }
            Err(err) => {
                tracing::error!("Loading logs failed: {err}");
                LogsState::Failed(describe_error(&err))
            }
        };
        true
    }
}

/// Server text first, then the status, then the transport message.
pub fn describe_error(err: &ClientError) -> String {
    match err.kind() {
        ErrorKind::Status { status, body } => {
            let body = body.trim();
            if body.is_empty() {
                format!("Failed to load logs ({status})")
            } else {
                body.to_string()
            }
        }
        _ => err.to_string(),
    }
}
