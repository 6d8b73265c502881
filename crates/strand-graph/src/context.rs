use std::collections::HashSet;
use strand_llm::UsageMetadata;
use strand_types::{AgentState, StreamEvent};

/// Per-request translator state
///
/// Owned by exactly one `StreamPump` run and dropped with it. Nothing in
/// here is shared across requests.
#[derive(Debug, Default)]
pub struct StreamContext {
    pub stream_id: String,

    /// Answer fragments for the current node only
    pub assistant_buffer: Vec<String>,
    /// Reasoning fragments for the current node only
    pub thinking_buffer: Vec<String>,

    pub historical_ai_contents: HashSet<String>,
    pub historical_tool_call_ids: HashSet<String>,
    pub emitted_tool_result_ids: HashSet<String>,
    pub requested_tool_call_ids: HashSet<String>,
    pub emitted_citation_keys: HashSet<String>,
    pub emitted_file_keys: HashSet<String>,
    pub emitted_structured_outputs: HashSet<String>,
    /// Nodes flagged as structured-output at runtime
    pub structured_nodes: HashSet<String>,

    pub is_streaming: bool,
    pub is_thinking: bool,
    pub agent_started: bool,
    pub seen_current_human_message: bool,

    /// Answer chunks emitted
    pub token_count: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tokens: u64,

    pub agent_state: Option<AgentState>,
}

impl StreamContext {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            ..Self::default()
        }
    }

    pub fn has_buffered_content(&self) -> bool {
        self.assistant_buffer.iter().any(|s| !s.is_empty())
    }

    pub fn buffered_text(&self) -> String {
        self.assistant_buffer.concat()
    }

    /// Drain the current node's answer text and drop its reasoning buffer
    pub fn take_node_output(&mut self) -> String {
        let output = self.assistant_buffer.concat();
        self.assistant_buffer.clear();
        self.thinking_buffer.clear();
        output
    }

    /// A new human turn started mid-replay
    pub fn start_turn(&mut self) {
        self.assistant_buffer.clear();
        self.thinking_buffer.clear();
        self.seen_current_human_message = true;
    }

    pub fn is_historical_content(&self, text: &str) -> bool {
        self.historical_ai_contents.contains(text)
    }

    pub fn is_structured_node(&self, node: &str) -> bool {
        self.structured_nodes.contains(node)
    }

    pub fn add_usage(&mut self, usage: UsageMetadata) {
        self.total_input_tokens += usage.input_tokens;
        self.total_output_tokens += usage.output_tokens;
        self.total_tokens += if usage.total_tokens > 0 {
            usage.total_tokens
        } else {
            usage.input_tokens + usage.output_tokens
        };
    }

    pub fn has_token_usage(&self) -> bool {
        self.total_input_tokens > 0 || self.total_output_tokens > 0 || self.total_tokens > 0
    }

    pub fn token_usage_event(&self) -> Option<StreamEvent> {
        self.has_token_usage().then(|| StreamEvent::TokenUsage {
            input: self.total_input_tokens,
            output: self.total_output_tokens,
            total: self.total_tokens,
        })
    }

    pub fn streaming_start(&mut self) -> Option<StreamEvent> {
        if self.is_streaming {
            return None;
        }
        self.is_streaming = true;
        Some(StreamEvent::StreamingStart {
            stream_id: self.stream_id.clone(),
        })
    }

    pub fn streaming_chunk(&mut self, text: String) -> StreamEvent {
        self.assistant_buffer.push(text.clone());
        self.token_count += 1;
        StreamEvent::StreamingChunk {
            stream_id: self.stream_id.clone(),
            text,
        }
    }

    /// Close the streaming span, if one is open
    pub fn streaming_end(&mut self) -> Option<StreamEvent> {
        if !self.is_streaming {
            return None;
        }
        self.is_streaming = false;
        Some(StreamEvent::StreamingEnd {
            stream_id: self.stream_id.clone(),
            agent_state: self.agent_state.clone(),
        })
    }

    pub fn thinking_start(&mut self) -> Option<StreamEvent> {
        if self.is_thinking {
            return None;
        }
        self.is_thinking = true;
        Some(StreamEvent::ThinkingStart)
    }

    pub fn thinking_chunk(&mut self, text: String) -> StreamEvent {
        self.thinking_buffer.push(text.clone());
        StreamEvent::ThinkingChunk { text }
    }

    pub fn thinking_end(&mut self) -> Option<StreamEvent> {
        if !self.is_thinking {
            return None;
        }
        self.is_thinking = false;
        Some(StreamEvent::ThinkingEnd)
    }
}
