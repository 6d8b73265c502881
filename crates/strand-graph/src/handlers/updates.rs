use serde_json::Value;
use std::sync::Arc;
use strand_llm::{AiMessage, Message, ToolCall, ToolMessage};
use strand_types::{AgentState, Citation, GeneratedFile, StreamConfig, StreamEvent};

use super::enter_node;
use crate::context::StreamContext;
use crate::tracer::ExecutionTracer;
use crate::upstream::StepUpdates;

const AGENT_STATE_KEY: &str = "agent_state";
const STRUCTURED_OUTPUT_FLAG: &str = "structured_output";
const CITATIONS_KEY: &str = "citations";
const GENERATED_FILES_KEY: &str = "generated_files";

/// Reduces full per-step state snapshots
///
/// This channel is the only one that emits tool traffic, structured node
/// output, citations and generated files.
pub struct UpdatesModeHandler {
    config: Arc<StreamConfig>,
}

impl UpdatesModeHandler {
    pub fn new(config: Arc<StreamConfig>) -> Self {
        Self { config }
    }

    pub fn handle(
        &self,
        updates: &StepUpdates,
        ctx: &mut StreamContext,
        tracer: &mut ExecutionTracer,
    ) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        for (step, payload) in updates {
            if !self.config.is_internal_step(step) {
                enter_node(&self.config, ctx, tracer, step, &mut events);
            }

            let messages = payload
                .as_ref()
                .map(|p| p.messages.as_slice())
                .unwrap_or_default();

            for message in messages {
                match message {
                    Message::AI(ai) | Message::AIChunk(ai) => {
                        for call in &ai.tool_calls {
                            events.extend(self.tool_request(call, ctx));
                        }
                    }
                    Message::Tool(tool) => events.extend(self.tool_response(tool, ctx)),
                    Message::System { .. } | Message::Human { .. } => {}
                }
            }

            let Some(last) = messages.last().and_then(Message::as_ai) else {
                continue;
            };

            self.merge_agent_state(last, tracer);

            if last.flag(STRUCTURED_OUTPUT_FLAG) && ctx.structured_nodes.insert(step.clone()) {
                tracing::debug!(node = %step, "Node flagged as structured output");
            }

            if self.config.is_structured_output_node(step) || ctx.is_structured_node(step) {
                self.structured_output(step, last, ctx, &mut events);
            }

            if self.config.is_answer_node(step) && !last.has_tool_calls() {
                events.extend(citations(last, ctx));
                events.extend(generated_files(last, ctx));
            }
        }

        events
    }

    fn tool_request(&self, call: &ToolCall, ctx: &mut StreamContext) -> Option<StreamEvent> {
        if call.id.is_empty() {
            tracing::warn!(tool = %call.name, "Tool call without id, skipping");
            return None;
        }
        if ctx.historical_tool_call_ids.contains(&call.id)
            || ctx.emitted_tool_result_ids.contains(&call.id)
            || !ctx.requested_tool_call_ids.insert(call.id.clone())
        {
            tracing::debug!(id = %call.id, "Skipping known tool call request");
            return None;
        }

        Some(StreamEvent::ToolCallRequest {
            id: call.id.clone(),
            name: call.name.clone(),
            args: call.args.clone(),
        })
    }

    fn tool_response(&self, tool: &ToolMessage, ctx: &mut StreamContext) -> Option<StreamEvent> {
        let id = &tool.tool_call_id;

        if ctx.historical_tool_call_ids.contains(id) || ctx.emitted_tool_result_ids.contains(id) {
            tracing::debug!(id = %id, "Skipping known tool result");
            return None;
        }
        // a response must never precede its request
        if !ctx.requested_tool_call_ids.contains(id) {
            tracing::warn!(id = %id, "Tool result for unknown request, skipping");
            return None;
        }

        ctx.emitted_tool_result_ids.insert(id.clone());

        Some(StreamEvent::ToolCallResponse {
            id: id.clone(),
            name: tool.name.clone(),
            result: tool.content.flatten_text(),
            is_error: tool.is_error(),
        })
    }

    fn merge_agent_state(&self, message: &AiMessage, tracer: &mut ExecutionTracer) {
        let Some(raw) = message.kwarg(AGENT_STATE_KEY) else {
            return;
        };

        match serde_json::from_value::<AgentState>(raw.clone()) {
            Ok(state) => tracer.apply_out_of_band(&state),
            Err(e) => tracing::warn!(error = %e, "Ignoring malformed agent_state payload"),
        }
    }

    /// Stream a node's whole output as one chunk
    fn structured_output(
        &self,
        step: &str,
        message: &AiMessage,
        ctx: &mut StreamContext,
        events: &mut Vec<StreamEvent>,
    ) {
        let text = message.text();
        if text.is_empty() {
            return;
        }
        if ctx.is_historical_content(&text) {
            tracing::debug!(node = %step, "Skipping replayed structured output");
            return;
        }
        if !ctx.emitted_structured_outputs.insert(format!("{step}\u{0}{text}")) {
            return;
        }

        events.extend(ctx.streaming_start());
        events.push(ctx.streaming_chunk(text));
    }
}

fn citations(message: &AiMessage, ctx: &mut StreamContext) -> Option<StreamEvent> {
    let fresh: Vec<Citation> = parse_list::<Citation>(message.kwarg(CITATIONS_KEY))
        .into_iter()
        .filter(|c| !c.key().is_empty() && ctx.emitted_citation_keys.insert(c.key().to_string()))
        .collect();

    (!fresh.is_empty()).then_some(StreamEvent::Citations { citations: fresh })
}

fn generated_files(message: &AiMessage, ctx: &mut StreamContext) -> Option<StreamEvent> {
    let fresh: Vec<GeneratedFile> = parse_list::<GeneratedFile>(message.kwarg(GENERATED_FILES_KEY))
        .into_iter()
        .filter(|f| match f.key() {
            Some(key) => ctx.emitted_file_keys.insert(key.to_string()),
            None => false,
        })
        .collect();

    (!fresh.is_empty()).then_some(StreamEvent::GeneratedFiles { files: fresh })
}

/// Entries that fail to parse are dropped individually
fn parse_list<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed reference");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::StepPayload;
    use serde_json::json;
    use strand_types::NodeKind;

    fn handler() -> UpdatesModeHandler {
        UpdatesModeHandler::new(Arc::new(StreamConfig::default()))
    }

    fn step(name: &str, messages: Vec<Message>) -> StepUpdates {
        let mut updates = StepUpdates::new();
        updates.insert(name.to_string(), Some(StepPayload { messages }));
        updates
    }

    fn kinds(events: &[StreamEvent]) -> Vec<&'static str> {
        events.iter().map(StreamEvent::kind).collect()
    }

    #[test]
    fn test_step_opens_node_span() {
        let mut ctx = StreamContext::new("s1");
        let mut tracer = ExecutionTracer::new("r1");

        let events = handler().handle(&step("agent", vec![]), &mut ctx, &mut tracer);
        assert_eq!(kinds(&events), vec!["node_start"]);

        let events = handler().handle(&step("research", vec![]), &mut ctx, &mut tracer);
        assert_eq!(kinds(&events), vec!["node_end", "node_start"]);
        assert_eq!(tracer.current_node(), Some("research"));
    }

    #[test]
    fn test_tool_step_does_not_transition() {
        let mut ctx = StreamContext::new("s1");
        let mut tracer = ExecutionTracer::new("r1");
        let h = handler();

        let request = Message::ai_with_tools(vec![ToolCall::new("c1", "search", json!({"q": "rust"}))]);
        let events = h.handle(&step("agent", vec![request]), &mut ctx, &mut tracer);
        assert_eq!(kinds(&events), vec!["node_start", "tool_call_request"]);

        let events = h.handle(
            &step("tools", vec![Message::tool_result("c1", "found it")]),
            &mut ctx,
            &mut tracer,
        );
        assert_eq!(
            events,
            vec![StreamEvent::ToolCallResponse {
                id: "c1".into(),
                name: None,
                result: "found it".into(),
                is_error: false,
            }]
        );
        assert_eq!(tracer.current_node(), Some("agent"));
    }

    #[test]
    fn test_unrequested_and_historical_results_are_skipped() {
        let mut ctx = StreamContext::new("s1");
        ctx.historical_tool_call_ids.insert("old".into());
        ctx.emitted_tool_result_ids.insert("old".into());
        let mut tracer = ExecutionTracer::new("r1");

        let events = handler().handle(
            &step(
                "tools",
                vec![Message::tool_result("old", "stale"), Message::tool_result("never", "?")],
            ),
            &mut ctx,
            &mut tracer,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_structured_node_streams_whole_text_once() {
        let mut ctx = StreamContext::new("s1");
        let mut tracer = ExecutionTracer::new("r1");
        let h = handler();
        let updates = step("generate_title", vec![Message::ai("Weather in Paris")]);

        let events = h.handle(&updates, &mut ctx, &mut tracer);
        assert_eq!(kinds(&events), vec!["node_start", "streaming_start", "streaming_chunk"]);
        assert!(matches!(
            &events[0],
            StreamEvent::NodeStart { node_kind: NodeKind::StructuredOutput, .. }
        ));

        let again = h.handle(&updates, &mut ctx, &mut tracer);
        assert!(again.is_empty());
    }

    #[test]
    fn test_runtime_structured_flag() {
        let mut ctx = StreamContext::new("s1");
        let mut tracer = ExecutionTracer::new("r1");
        let message = Message::AI(AiMessage::new("{\"label\":\"billing\"}").with_kwarg("structured_output", json!(true)));

        let events = handler().handle(&step("router", vec![message]), &mut ctx, &mut tracer);

        assert!(ctx.is_structured_node("router"));
        assert_eq!(kinds(&events), vec!["node_start", "streaming_start", "streaming_chunk"]);
    }

    #[test]
    fn test_agent_state_payload_is_merged() {
        let mut ctx = StreamContext::new("s1");
        let mut tracer = ExecutionTracer::new("r1");
        let message = Message::AI(AiMessage::new("").with_kwarg(
            "agent_state",
            json!({
                "node_outputs": {"planner": "1. search"},
                "node_order": ["planner"],
                "node_names": {"planner": "Planner"}
            }),
        ));

        handler().handle(&step("supervisor", vec![message]), &mut ctx, &mut tracer);

        let state = tracer.get_agent_state();
        assert_eq!(state.node_outputs["planner"], "1. search");
        assert_eq!(state.node_names["planner"], "Planner");
    }

    #[test]
    fn test_citations_and_files_emitted_once() {
        let mut ctx = StreamContext::new("s1");
        let mut tracer = ExecutionTracer::new("r1");
        let h = handler();
        let message = Message::AI(
            AiMessage::new("See sources.")
                .with_kwarg(
                    "citations",
                    json!([
                        {"url": "https://a.example", "title": "A"},
                        {"url": "https://a.example"},
                        {"title": "no url"}
                    ]),
                )
                .with_kwarg("generated_files", json!([{"file_id": "f1", "name": "chart.png"}, {"name": "orphan"}])),
        );

        let events = h.handle(&step("agent", vec![message.clone()]), &mut ctx, &mut tracer);
        assert_eq!(kinds(&events), vec!["node_start", "citations", "generated_files"]);
        let StreamEvent::Citations { citations } = &events[1] else {
            panic!("Expected Citations event");
        };
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].title.as_deref(), Some("A"));

        let again = h.handle(&step("agent", vec![message]), &mut ctx, &mut tracer);
        assert!(again.is_empty());
    }

    #[test]
    fn test_no_references_while_tool_calls_pending() {
        let mut ctx = StreamContext::new("s1");
        let mut tracer = ExecutionTracer::new("r1");
        let message = Message::AI(
            AiMessage::new("")
                .with_tool_calls(vec![ToolCall::new("c1", "search", json!({}))])
                .with_kwarg("citations", json!([{"url": "https://a.example"}])),
        );

        let events = handler().handle(&step("agent", vec![message]), &mut ctx, &mut tracer);
        assert_eq!(kinds(&events), vec!["node_start", "tool_call_request"]);
    }
}
