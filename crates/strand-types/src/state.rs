use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::events::{NodeKind, RunStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventType {
    AgentStart,
    NodeStart,
    NodeEnd,
    AgentEnd,
}

/// One lifecycle record of a run, in execution order
///
/// `sequence` is dense and starts at 0 per run, so `(run_id, sequence)`
/// identifies an entry for idempotent appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub sequence: u64,
    pub event_type: TimelineEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_kind: Option<NodeKind>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
}

/// Replayable projection of a run's node outputs
///
/// This is the shape older clients expect on `streaming_end`, and what
/// the run store keeps as the final node data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    #[serde(default)]
    pub node_outputs: BTreeMap<String, String>,
    #[serde(default)]
    pub node_order: Vec<String>,
    #[serde(default)]
    pub node_names: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node: Option<String>,
}

impl AgentState {
    pub fn is_empty(&self) -> bool {
        self.node_outputs.is_empty() && self.node_order.is_empty() && self.node_names.is_empty()
    }
}
