use std::sync::Arc;
use strand_llm::Message;
use strand_types::{StreamConfig, StreamEvent};

use super::enter_node;
use crate::context::StreamContext;
use crate::tracer::ExecutionTracer;
use crate::upstream::Metadata;

const STRUCTURED_OUTPUT_FLAG: &str = "structured_output";

/// Reduces token deltas into thinking and answer spans
pub struct MessagesModeHandler {
    config: Arc<StreamConfig>,
}

impl MessagesModeHandler {
    pub fn new(config: Arc<StreamConfig>) -> Self {
        Self { config }
    }

    pub fn handle(
        &self,
        fragment: &Message,
        metadata: &Metadata,
        ctx: &mut StreamContext,
        tracer: &mut ExecutionTracer,
    ) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        let ai = match fragment {
            Message::Human { .. } => {
                ctx.start_turn();
                tracing::debug!("Human turn boundary, buffers cleared");
                return events;
            }
            // tool results are owned by the updates channel
            Message::Tool(_) | Message::System { .. } => return events,
            Message::AI(ai) | Message::AIChunk(ai) => ai,
        };

        let node = metadata.node();
        if let Some(node) = node {
            if metadata.flag(STRUCTURED_OUTPUT_FLAG) && ctx.structured_nodes.insert(node.to_string()) {
                tracing::debug!(node = %node, "Node flagged as structured output");
            }
            if self.is_silent_node(node, ctx) {
                return events;
            }
        }

        if let Some(next) = tracer.detect_node_transition(metadata) {
            enter_node(&self.config, ctx, tracer, &next, &mut events);
        }

        let text = ai.text();

        if !fragment.is_chunk() {
            if !text.is_empty() && ctx.is_historical_content(&text) {
                tracing::debug!(len = text.len(), "Skipping replayed history message");
                return events;
            }
            if ctx.has_buffered_content() {
                // trailing echo of what was already streamed for this node
                tracing::debug!(len = text.len(), "Skipping full message after streamed deltas");
                return events;
            }
        }

        let thinking = ai.thinking();
        if !thinking.is_empty() {
            self.ensure_node(node, ctx, tracer, &mut events);
            events.extend(ctx.thinking_start());
            events.push(ctx.thinking_chunk(thinking));
        } else {
            // any fragment without reasoning text ends the thinking span
            events.extend(ctx.thinking_end());
        }

        if !text.is_empty() {
            self.ensure_node(node, ctx, tracer, &mut events);
            events.extend(ctx.streaming_start());
            events.push(ctx.streaming_chunk(text));
        }

        if let Some(usage) = ai.usage() {
            ctx.add_usage(usage);
        }

        events
    }

    /// Nodes whose output never arrives as deltas
    fn is_silent_node(&self, node: &str, ctx: &StreamContext) -> bool {
        self.config.is_internal_step(node)
            || self.config.is_structured_output_node(node)
            || ctx.is_structured_node(node)
    }

    /// Open a synthetic node span when content arrives outside of any node
    fn ensure_node(
        &self,
        node: Option<&str>,
        ctx: &mut StreamContext,
        tracer: &mut ExecutionTracer,
        events: &mut Vec<StreamEvent>,
    ) {
        if tracer.current_node().is_some() {
            return;
        }

        let node_id = node.unwrap_or(&self.config.default_node).to_string();
        enter_node(&self.config, ctx, tracer, &node_id, events);
    }
}
