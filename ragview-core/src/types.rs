use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Graph node reference attached to a chat answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of a successful `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub content: String,
    #[serde(default)]
    pub node: Option<NodeRef>,
}

impl ChatReply {
    pub fn focused_entity(&self) -> Option<&str> {
        self.node
            .as_ref()
            .and_then(|node| node.name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FocusedPokemon {
    Name(String),
    Node { name: String },
}

impl FocusedPokemon {
    pub fn name(&self) -> &str {
        match self {
            FocusedPokemon::Name(name) => name,
            FocusedPokemon::Node { name } => name,
        }
    }
}

/// One line of the backend's evaluation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub timestamp: String,
    pub query: String,
    pub answer: String,
    #[serde(default)]
    pub retrieved_context: Value,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub evaluation: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused_pokemon: Option<FocusedPokemon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl EvaluationRecord {
    pub fn focused_name(&self) -> Option<&str> {
        self.focused_pokemon
            .as_ref()
            .map(FocusedPokemon::name)
            .filter(|name| !name.is_empty())
    }

    pub fn retrieved_context_text(&self) -> String {
        match &self.retrieved_context {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }

    /// Empty when the key is absent or null.
    pub fn grounded_in_graph_text(&self) -> String {
        match self.evaluation.get("grounded_in_graph") {
            None | Some(Value::Null) => String::new(),
            Some(value) => value_text(value),
        }
    }

    pub fn latency_ms(&self) -> Option<&Value> {
        self.evaluation.get("latency_ms")
    }

    pub fn display_timestamp(&self) -> String {
        match DateTime::parse_from_rfc3339(&self.timestamp) {
            Ok(parsed) => parsed
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            Err(_) => self.timestamp.clone(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
