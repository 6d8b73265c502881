use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::Content;

/// Tool call requested by the model (attached to an AI message)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,

    pub name: String,

    /// Parsed arguments object
    #[serde(default)]
    pub args: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// Parse arguments into a typed struct
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.args.clone())
    }
}

/// Result of a tool execution, fed back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMessage {
    pub tool_call_id: String,

    #[serde(default)]
    pub content: Content,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// "success" or "error"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ToolMessage {
    pub fn new(tool_call_id: impl Into<String>, content: impl Into<Content>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            name: None,
            status: None,
            id: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }
}
