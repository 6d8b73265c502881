//! Upstream chunk model
//!
//! The engine interleaves two differently-shaped channels over one stream:
//! `updates` (a per-step state snapshot) and `messages` (a token delta plus
//! the metadata of the step that produced it). Each is decoded on its own;
//! there is no attempt to unify them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strand_llm::Message;
use thiserror::Error;

/// Metadata keys the engine uses to name the emitting node
pub const NODE_METADATA_KEYS: [&str; 2] = ["langgraph_node", "node"];

pub const UPDATES_MODE: &str = "updates";
pub const MESSAGES_MODE: &str = "messages";

/// One undecoded `(mode, payload)` pair as read off the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChunk {
    pub mode: String,
    pub payload: Value,
}

/// Step name → step payload, in the order the engine reported them
pub type StepUpdates = IndexMap<String, Option<StepPayload>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepPayload {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Per-chunk metadata attached to `messages` chunks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(pub Map<String, Value>);

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamChunk {
    Updates(StepUpdates),
    Messages { fragment: Message, metadata: Metadata },
}

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("unknown stream mode: {0}")]
    UnknownMode(String),

    #[error("malformed {mode} chunk: {source}")]
    Malformed {
        mode: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed messages chunk: expected [message, metadata]")]
    MessagesShape,
}

impl RawChunk {
    pub fn new(mode: impl Into<String>, payload: Value) -> Self {
        Self {
            mode: mode.into(),
            payload,
        }
    }

    pub fn updates(payload: Value) -> Self {
        Self::new(UPDATES_MODE, payload)
    }

    /// Build a `messages` chunk from a typed fragment
    pub fn messages(fragment: &Message, metadata: Value) -> Result<Self, serde_json::Error> {
        let fragment = serde_json::to_value(fragment)?;
        Ok(Self::new(MESSAGES_MODE, Value::Array(vec![fragment, metadata])))
    }

    pub fn decode(self) -> Result<UpstreamChunk, ChunkError> {
        match self.mode.as_str() {
            UPDATES_MODE => {
                let steps: IndexMap<String, Value> = serde_json::from_value(self.payload)
                    .map_err(|source| ChunkError::Malformed { mode: UPDATES_MODE, source })?;
                Ok(UpstreamChunk::Updates(decode_steps(steps)))
            }
            MESSAGES_MODE => {
                let Value::Array(mut items) = self.payload else {
                    return Err(ChunkError::MessagesShape);
                };
                if items.is_empty() || items.len() > 2 {
                    return Err(ChunkError::MessagesShape);
                }

                let metadata = match items.len() {
                    2 => items.pop().unwrap_or(Value::Null),
                    _ => Value::Null,
                };
                let fragment = items.pop().unwrap_or(Value::Null);

                let fragment: Message = serde_json::from_value(fragment)
                    .map_err(|source| ChunkError::Malformed { mode: MESSAGES_MODE, source })?;
                let metadata = match metadata {
                    Value::Null => Metadata::default(),
                    other => serde_json::from_value(other)
                        .map_err(|source| ChunkError::Malformed { mode: MESSAGES_MODE, source })?,
                };

                Ok(UpstreamChunk::Messages { fragment, metadata })
            }
            other => Err(ChunkError::UnknownMode(other.to_string())),
        }
    }
}

/// Decode each step on its own so one odd step does not cost its siblings
fn decode_steps(steps: IndexMap<String, Value>) -> StepUpdates {
    let mut updates = StepUpdates::with_capacity(steps.len());

    for (step, value) in steps {
        let payload = match value {
            Value::Null => None,
            value @ Value::Object(_) => match serde_json::from_value::<StepPayload>(value) {
                Ok(payload) => Some(payload),
                Err(e) => {
                    tracing::warn!(step = %step, error = %e, "Skipping undecodable step payload");
                    continue;
                }
            },
            // e.g. `__interrupt__` carries a list of interrupts
            other => {
                tracing::warn!(step = %step, kind = value_kind(&other), "Skipping non-object step payload");
                continue;
            }
        };
        updates.insert(step, payload);
    }

    updates
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Metadata {
    /// Node that produced the chunk, under either accepted key
    pub fn node(&self) -> Option<&str> {
        NODE_METADATA_KEYS
            .iter()
            .find_map(|key| self.0.get(*key).and_then(Value::as_str))
            .filter(|node| !node.is_empty())
    }

    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_updates_preserves_step_order() {
        let raw = RawChunk::updates(json!({
            "planner": {"messages": [{"type": "ai", "content": "plan"}]},
            "agent": null,
            "tools": {"messages": []}
        }));

        let UpstreamChunk::Updates(updates) = raw.decode().unwrap() else {
            panic!("Expected Updates chunk");
        };

        let steps: Vec<&str> = updates.keys().map(String::as_str).collect();
        assert_eq!(steps, vec!["planner", "agent", "tools"]);
        assert!(updates["agent"].is_none());
        assert_eq!(updates["planner"].as_ref().unwrap().messages.len(), 1);
    }

    #[test]
    fn test_decode_updates_skips_only_odd_steps() {
        let raw = RawChunk::updates(json!({
            "agent": {"messages": [{
                "type": "ai",
                "content": "",
                "tool_calls": [{"id": "c1", "name": "search", "args": {}}]
            }]},
            "__interrupt__": [{"value": "approve?"}],
            "router": {"messages": "not a list"},
            "tools": null
        }));

        let UpstreamChunk::Updates(updates) = raw.decode().unwrap() else {
            panic!("Expected Updates chunk");
        };

        let steps: Vec<&str> = updates.keys().map(String::as_str).collect();
        assert_eq!(steps, vec!["agent", "tools"]);
        let agent = updates["agent"].as_ref().unwrap();
        assert_eq!(agent.messages[0].as_ai().unwrap().tool_calls[0].id, "c1");
    }

    #[test]
    fn test_decode_messages_pair() {
        let raw = RawChunk::messages(&Message::ai_chunk("Hel"), json!({"langgraph_node": "agent"})).unwrap();

        let UpstreamChunk::Messages { fragment, metadata } = raw.decode().unwrap() else {
            panic!("Expected Messages chunk");
        };

        assert!(fragment.is_chunk());
        assert_eq!(metadata.node(), Some("agent"));
    }

    #[test]
    fn test_metadata_accepts_both_node_keys() {
        let metadata: Metadata = serde_json::from_value(json!({"node": "writer"})).unwrap();
        assert_eq!(metadata.node(), Some("writer"));

        let metadata: Metadata = serde_json::from_value(json!({"langgraph_step": 3})).unwrap();
        assert_eq!(metadata.node(), None);
    }

    #[test]
    fn test_messages_without_metadata() {
        let raw = RawChunk::new(MESSAGES_MODE, json!([{"type": "human", "content": "hi"}]));
        let UpstreamChunk::Messages { fragment, metadata } = raw.decode().unwrap() else {
            panic!("Expected Messages chunk");
        };
        assert!(fragment.is_human());
        assert_eq!(metadata, Metadata::default());
    }

    #[test]
    fn test_malformed_chunks_are_errors() {
        let unknown = RawChunk::new("values", json!({}));
        assert!(matches!(unknown.decode(), Err(ChunkError::UnknownMode(_))));

        let not_a_pair = RawChunk::new(MESSAGES_MODE, json!({"content": "x"}));
        assert!(matches!(not_a_pair.decode(), Err(ChunkError::MessagesShape)));

        let bad_message = RawChunk::new(MESSAGES_MODE, json!([{"type": "robot"}, {}]));
        assert!(matches!(bad_message.decode(), Err(ChunkError::Malformed { .. })));

        let bad_updates = RawChunk::updates(json!(["agent"]));
        assert!(matches!(bad_updates.decode(), Err(ChunkError::Malformed { .. })));
    }
}
