use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::content::Content;
use super::tool::{ToolCall, ToolMessage};
use super::usage::UsageMetadata;

/// Messages as the agent-execution engine emits them
///
/// Full messages (`ai`) appear in state snapshots and history replays;
/// `AIMessageChunk` is a token delta from a streaming model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// System prompt (instructions)
    #[serde(rename = "system", alias = "SystemMessage")]
    System {
        #[serde(default)]
        content: Content,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// User/Human message
    #[serde(rename = "human", alias = "HumanMessage", alias = "user")]
    Human {
        #[serde(default)]
        content: Content,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Complete assistant message
    #[serde(rename = "ai", alias = "AIMessage", alias = "assistant")]
    AI(AiMessage),

    /// Incremental assistant delta
    #[serde(rename = "AIMessageChunk", alias = "ai_chunk")]
    AIChunk(AiMessage),

    /// Tool result message
    #[serde(rename = "tool", alias = "ToolMessage")]
    Tool(ToolMessage),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiMessage {
    #[serde(default)]
    pub content: Content,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Provider side-channel: reasoning text, citations, generated files,
    /// out-of-band agent state
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub additional_kwargs: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub response_metadata: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create system message
    pub fn system(content: impl Into<Content>) -> Self {
        Self::System {
            content: content.into(),
            id: None,
        }
    }

    /// Create human message
    pub fn human(content: impl Into<Content>) -> Self {
        Self::Human {
            content: content.into(),
            id: None,
        }
    }

    /// Create complete AI message with text
    pub fn ai(content: impl Into<Content>) -> Self {
        Self::AI(AiMessage::new(content))
    }

    /// Create AI message with tool calls
    pub fn ai_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self::AI(AiMessage {
            tool_calls,
            ..AiMessage::default()
        })
    }

    /// Create streaming delta
    pub fn ai_chunk(content: impl Into<Content>) -> Self {
        Self::AIChunk(AiMessage::new(content))
    }

    /// Create tool result message
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<Content>) -> Self {
        Self::Tool(ToolMessage::new(tool_call_id, content))
    }

    /// Get role as string
    pub fn role(&self) -> &str {
        match self {
            Self::System { .. } => "system",
            Self::Human { .. } => "user",
            Self::AI(_) | Self::AIChunk(_) => "assistant",
            Self::Tool(_) => "tool",
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, Self::Human { .. })
    }

    pub fn is_chunk(&self) -> bool {
        matches!(self, Self::AIChunk(_))
    }

    /// Assistant payload, for both full messages and deltas
    pub fn as_ai(&self) -> Option<&AiMessage> {
        match self {
            Self::AI(ai) | Self::AIChunk(ai) => Some(ai),
            _ => None,
        }
    }

    pub fn as_tool(&self) -> Option<&ToolMessage> {
        match self {
            Self::Tool(tool) => Some(tool),
            _ => None,
        }
    }

    /// Flattened text content of any message kind
    pub fn text(&self) -> String {
        match self {
            Self::System { content, .. } | Self::Human { content, .. } => content.flatten_text(),
            Self::AI(ai) | Self::AIChunk(ai) => ai.text(),
            Self::Tool(tool) => tool.content.flatten_text(),
        }
    }
}

impl AiMessage {
    pub fn new(content: impl Into<Content>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.additional_kwargs.insert(key.into(), value);
        self
    }

    pub fn with_usage(mut self, usage: UsageMetadata) -> Self {
        self.usage_metadata = Some(usage);
        self
    }

    /// Answer text (text parts only)
    pub fn text(&self) -> String {
        self.content.flatten_text()
    }

    /// Reasoning text carried by this message, from any channel the
    /// providers use: inline thinking parts, `reasoning_content`, or a
    /// `reasoning.summary` list.
    pub fn thinking(&self) -> String {
        let mut thinking = self.content.thinking_text();

        if let Some(text) = self.additional_kwargs.get("reasoning_content").and_then(Value::as_str) {
            thinking.push_str(text);
        }

        if let Some(summary) = self
            .additional_kwargs
            .get("reasoning")
            .and_then(|r| r.get("summary"))
            .and_then(Value::as_array)
        {
            for item in summary {
                if let Some(text) = item.get("text").and_then(Value::as_str) {
                    thinking.push_str(text);
                }
            }
        }

        thinking
    }

    /// Token usage, preferring `usage_metadata` over `response_metadata.token_usage`
    pub fn usage(&self) -> Option<UsageMetadata> {
        self.usage_metadata.or_else(|| {
            self.response_metadata
                .get("token_usage")
                .and_then(UsageMetadata::from_token_usage)
        })
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.additional_kwargs.get(key)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.kwarg(key).and_then(Value::as_bool).unwrap_or(false)
    }
}
