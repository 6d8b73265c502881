use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Instant;
use strand_types::{AgentState, NodeKind, RunStatus, StreamEvent, TimelineEntry, TimelineEventType};

use crate::upstream::Metadata;

const NODE_OUTPUT_SEPARATOR: &str = "\n\n";

/// Single source of truth for which node is active and what happened, in
/// order.
///
/// The tracer never emits a `node_end` for a node it did not start, and
/// never an `agent_end` without an `agent_start`.
#[derive(Debug)]
pub struct ExecutionTracer {
    run_id: String,
    current_node_id: Option<String>,
    last_node_id: Option<String>,
    agent_started: bool,
    agent_ended: bool,
    timeline: Vec<TimelineEntry>,
    /// Entries already handed to the run store
    persisted: usize,
    node_outputs: BTreeMap<String, String>,
    node_order: Vec<String>,
    node_names: BTreeMap<String, String>,
    open_node_name: Option<String>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl ExecutionTracer {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            current_node_id: None,
            last_node_id: None,
            agent_started: false,
            agent_ended: false,
            timeline: Vec::new(),
            persisted: 0,
            node_outputs: BTreeMap::new(),
            node_order: Vec::new(),
            node_names: BTreeMap::new(),
            open_node_name: None,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn current_node(&self) -> Option<&str> {
        self.current_node_id.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    /// Idempotent; only the first call yields `agent_start`
    pub fn on_agent_start(&mut self, stream_id: &str) -> Option<StreamEvent> {
        if self.agent_started {
            return None;
        }

        self.agent_started = true;
        self.started_at = Utc::now();
        self.started = Instant::now();
        self.push_entry(TimelineEventType::AgentStart, None, None, None, None, None);

        tracing::debug!(run_id = %self.run_id, "Agent started");

        Some(StreamEvent::AgentStart {
            run_id: self.run_id.clone(),
            stream_id: stream_id.to_string(),
            timestamp: self.started_at.timestamp_millis(),
        })
    }

    /// Node named by `metadata`, if it is not the one already running
    pub fn detect_node_transition(&self, metadata: &Metadata) -> Option<String> {
        let node = metadata.node()?;
        if self.current_node_id.as_deref() == Some(node) {
            return None;
        }
        Some(node.to_string())
    }

    pub fn on_node_start(
        &mut self,
        node_id: &str,
        node_name: &str,
        node_kind: NodeKind,
    ) -> Option<StreamEvent> {
        if self.current_node_id.as_deref() == Some(node_id) {
            return None;
        }
        if let Some(open) = &self.current_node_id {
            tracing::warn!(open = %open, next = %node_id, "Node started while another is still open");
        }

        self.current_node_id = Some(node_id.to_string());
        self.open_node_name = Some(node_name.to_string());
        self.push_entry(
            TimelineEventType::NodeStart,
            Some(node_id),
            Some(node_name),
            Some(node_kind),
            None,
            None,
        );

        tracing::debug!(node = %node_id, kind = ?node_kind, "Node started");

        Some(StreamEvent::NodeStart {
            node_id: node_id.to_string(),
            node_name: node_name.to_string(),
            node_kind,
        })
    }

    /// Close `node_id` if it is the running node
    ///
    /// A node that runs more than once in a turn accumulates its outputs,
    /// separated by a blank line.
    pub fn on_node_end(&mut self, node_id: &str, status: RunStatus, output: String) -> Option<StreamEvent> {
        if self.current_node_id.as_deref() != Some(node_id) {
            return None;
        }

        let node_name = self
            .open_node_name
            .take()
            .unwrap_or_else(|| node_id.to_string());

        self.push_entry(
            TimelineEventType::NodeEnd,
            Some(node_id),
            Some(&node_name),
            None,
            Some(output.clone()),
            Some(status),
        );

        let slot = self.node_outputs.entry(node_id.to_string()).or_default();
        if !output.is_empty() {
            if !slot.is_empty() {
                slot.push_str(NODE_OUTPUT_SEPARATOR);
            }
            slot.push_str(&output);
        }
        if !self.node_order.iter().any(|n| n == node_id) {
            self.node_order.push(node_id.to_string());
        }
        self.node_names.insert(node_id.to_string(), node_name);

        self.current_node_id = None;
        self.last_node_id = Some(node_id.to_string());

        tracing::debug!(node = %node_id, status = status.as_str(), output_len = output.len(), "Node ended");

        Some(StreamEvent::NodeEnd {
            node_id: node_id.to_string(),
            status,
            output,
        })
    }

    pub fn on_agent_end(&mut self, status: RunStatus) -> Option<StreamEvent> {
        if !self.agent_started || self.agent_ended {
            return None;
        }

        self.agent_ended = true;
        self.push_entry(TimelineEventType::AgentEnd, None, None, None, None, Some(status));

        let duration_ms = self.duration_ms();
        tracing::debug!(run_id = %self.run_id, status = status.as_str(), duration_ms, "Agent ended");

        Some(StreamEvent::AgentEnd { status, duration_ms })
    }

    /// Out-of-band update for output that arrived whole through a state
    /// snapshot; replaces whatever was recorded for the node
    pub fn record_node_output(&mut self, node_id: &str, output: impl Into<String>, node_name: Option<&str>) {
        self.node_outputs.insert(node_id.to_string(), output.into());
        if !self.node_order.iter().any(|n| n == node_id) {
            self.node_order.push(node_id.to_string());
        }
        if let Some(name) = node_name {
            self.node_names.insert(node_id.to_string(), name.to_string());
        }
    }

    /// Merge a timeline fragment handed back by a node
    pub fn apply_out_of_band(&mut self, state: &AgentState) {
        let ordered = state
            .node_order
            .iter()
            .chain(state.node_outputs.keys().filter(|id| !state.node_order.contains(id)));

        for node_id in ordered {
            let name = state.node_names.get(node_id).map(String::as_str);
            match state.node_outputs.get(node_id) {
                Some(output) => self.record_node_output(node_id, output.clone(), name),
                None => {
                    if !self.node_order.contains(node_id) {
                        self.node_order.push(node_id.clone());
                    }
                    if let Some(name) = name {
                        self.node_names.insert(node_id.clone(), name.to_string());
                    }
                }
            }
        }

        // names for nodes that carried neither output nor order
        for (node_id, name) in &state.node_names {
            self.node_names.entry(node_id.clone()).or_insert_with(|| name.clone());
        }

        tracing::debug!(nodes = state.node_order.len(), "Merged out-of-band node state");
    }

    pub fn get_agent_state(&self) -> AgentState {
        AgentState {
            node_outputs: self.node_outputs.clone(),
            node_order: self.node_order.clone(),
            node_names: self.node_names.clone(),
            current_node: self
                .current_node_id
                .clone()
                .or_else(|| self.last_node_id.clone()),
        }
    }

    /// Timeline entries not yet handed to the run store
    pub fn take_unpersisted(&mut self) -> Vec<TimelineEntry> {
        let pending = self.timeline[self.persisted..].to_vec();
        self.persisted = self.timeline.len();
        pending
    }

    fn push_entry(
        &mut self,
        event_type: TimelineEventType,
        node_id: Option<&str>,
        node_name: Option<&str>,
        node_kind: Option<NodeKind>,
        output: Option<String>,
        status: Option<RunStatus>,
    ) {
        self.timeline.push(TimelineEntry {
            sequence: self.timeline.len() as u64,
            event_type,
            node_id: node_id.map(str::to_string),
            node_name: node_name.map(str::to_string),
            node_kind,
            timestamp: Utc::now(),
            output,
            status,
        });
    }
}
