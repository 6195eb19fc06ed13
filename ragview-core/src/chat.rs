use chrono::{DateTime, Local};

use crate::errors::ClientResult;
use crate::types::ChatReply;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: u64,
    pub role: Role,
    pub text: String,
    pub sent_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message_id: u64,
    pub text: String,
}

/// Transcript plus the focus hint derived from the latest answer.
#[derive(Debug, Default)]
pub struct ChatController {
    transcript: Vec<ChatMessage>,
    next_id: u64,
    pending: usize,
    focused_entity: Option<String>,
}

impl ChatController {
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn focused_entity(&self) -> Option<&str> {
        self.focused_entity.as_deref()
    }

    pub fn is_waiting(&self) -> bool {
        self.pending > 0
    }

    /// Appends the user's message right away; the reply comes later.
    pub fn submit(&mut self, input: &str) -> Option<ChatRequest> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        let message_id = self.push(Role::User, text.to_string());
        self.pending += 1;
        Some(ChatRequest {
            message_id,
            text: text.to_string(),
        })
    }

    pub fn complete(&mut self, message_id: u64, result: ClientResult<ChatReply>) {
        self.pending = self.pending.saturating_sub(1);
        match result {
            Ok(reply) => {
                if let Some(name) = reply.focused_entity() {
                    self.focused_entity = Some(name.to_string());
                }
                self.push(Role::Assistant, reply.content);
            }
            Err(err) => {
                tracing::error!("Chat request for message {message_id} failed: {err}");
            }
        }
    }

    fn push(&mut self, role: Role, text: String) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.transcript.push(ChatMessage {
            id,
            role,
            text,
            sent_at: Local::now(),
        });
        id
    }
}
