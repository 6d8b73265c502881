use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::AgentState;

/// Client-facing event protocol
///
/// One answer stream is an ordered sequence of these. The transport must
/// preserve order; every `*_start` is matched by exactly one `*_end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Request accepted, history indexed, nothing streamed yet
    Processing {
        stream_id: String,
    },

    AgentStart {
        run_id: String,
        stream_id: String,
        timestamp: i64,
    },

    NodeStart {
        node_id: String,
        node_name: String,
        node_kind: NodeKind,
    },

    ThinkingStart,

    /// Reasoning text (streamed token-by-token)
    ThinkingChunk {
        text: String,
    },

    ThinkingEnd,

    StreamingStart {
        stream_id: String,
    },

    /// Answer text (streamed token-by-token)
    StreamingChunk {
        stream_id: String,
        text: String,
    },

    StreamingEnd {
        stream_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent_state: Option<AgentState>,
    },

    ToolCallRequest {
        id: String,
        name: String,
        args: Value,
    },

    ToolCallResponse {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        result: String,
        is_error: bool,
    },

    Citations {
        citations: Vec<Citation>,
    },

    GeneratedFiles {
        files: Vec<GeneratedFile>,
    },

    TokenUsage {
        input: u64,
        output: u64,
        total: u64,
    },

    NodeEnd {
        node_id: String,
        status: RunStatus,
        output: String,
    },

    AgentEnd {
        status: RunStatus,
        duration_ms: u64,
    },

    /// Human-readable failure; never carries provider error text
    Error {
        message: String,
        category: ErrorCategory,
    },
}

impl StreamEvent {
    /// Wire tag of this event
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Processing { .. } => "processing",
            Self::AgentStart { .. } => "agent_start",
            Self::NodeStart { .. } => "node_start",
            Self::ThinkingStart => "thinking_start",
            Self::ThinkingChunk { .. } => "thinking_chunk",
            Self::ThinkingEnd => "thinking_end",
            Self::StreamingStart { .. } => "streaming_start",
            Self::StreamingChunk { .. } => "streaming_chunk",
            Self::StreamingEnd { .. } => "streaming_end",
            Self::ToolCallRequest { .. } => "tool_call_request",
            Self::ToolCallResponse { .. } => "tool_call_response",
            Self::Citations { .. } => "citations",
            Self::GeneratedFiles { .. } => "generated_files",
            Self::TokenUsage { .. } => "token_usage",
            Self::NodeEnd { .. } => "node_end",
            Self::AgentEnd { .. } => "agent_end",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AgentEnd { .. } | Self::Error { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// LLM call that streams tokens
    Model,
    /// Node whose output arrives whole, via state snapshots
    StructuredOutput,
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// User-facing failure buckets for upstream errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ContextTooLong,
    ContentFiltered,
    RateLimited,
    AuthenticationFailed,
    Generic,
}

impl ErrorCategory {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ContextTooLong => {
                "The conversation is too long for the model. Start a new topic or shorten your message."
            }
            Self::ContentFiltered => {
                "The response was blocked by the provider's content policy."
            }
            Self::RateLimited => "The model provider is rate limiting requests. Please try again shortly.",
            Self::AuthenticationFailed => {
                "The model provider rejected the configured credentials."
            }
            Self::Generic => "Something went wrong while generating the response.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Citation {
    pub fn key(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl GeneratedFile {
    /// Identity used for dedup; a file with neither id nor path has none
    pub fn key(&self) -> Option<&str> {
        self.file_id.as_deref().or(self.path.as_deref())
    }
}
