use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::events::NodeKind;

/// Node allow-lists and behaviour switches for one translator instance
///
/// Node names are opaque strings chosen by whoever builds the agent graph,
/// so everything name-based lives here rather than in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Tool-execution steps: never stream, never open node spans
    pub tool_nodes: Vec<String>,
    /// Steps whose output arrives whole through state snapshots
    pub structured_output_nodes: Vec<String>,
    /// Terminal model steps scanned for citations and generated files
    pub answer_nodes: Vec<String>,
    /// Node used when answer text arrives before any node was identified
    pub default_node: String,
    pub display_names: HashMap<String, String>,
    /// Flush timeline entries to the run store as they are produced
    pub incremental_timeline: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tool_nodes: vec!["tools".to_string()],
            structured_output_nodes: vec![
                "structured_output".to_string(),
                "generate_title".to_string(),
                "classifier".to_string(),
            ],
            answer_nodes: vec!["agent".to_string(), "model".to_string()],
            default_node: "agent".to_string(),
            display_names: HashMap::new(),
            incremental_timeline: false,
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tool_nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_structured_output_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.structured_output_nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_answer_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.answer_nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_node(mut self, node: impl Into<String>) -> Self {
        self.default_node = node.into();
        self
    }

    pub fn with_display_name(mut self, node: impl Into<String>, name: impl Into<String>) -> Self {
        self.display_names.insert(node.into(), name.into());
        self
    }

    pub fn with_incremental_timeline(mut self, enabled: bool) -> Self {
        self.incremental_timeline = enabled;
        self
    }

    pub fn is_tool_node(&self, node: &str) -> bool {
        self.tool_nodes.iter().any(|n| n == node)
    }

    pub fn is_structured_output_node(&self, node: &str) -> bool {
        self.structured_output_nodes.iter().any(|n| n == node)
    }

    pub fn is_answer_node(&self, node: &str) -> bool {
        self.answer_nodes.iter().any(|n| n == node)
    }

    /// Engine bookkeeping steps such as `__start__` or `__interrupt__`
    pub fn is_internal_step(&self, node: &str) -> bool {
        (node.starts_with("__") && node.ends_with("__")) || self.is_tool_node(node)
    }

    pub fn display_name(&self, node: &str) -> String {
        self.display_names
            .get(node)
            .cloned()
            .unwrap_or_else(|| node.to_string())
    }

    pub fn node_kind(&self, node: &str) -> NodeKind {
        if self.is_structured_output_node(node) {
            NodeKind::StructuredOutput
        } else if self.is_answer_node(node) {
            NodeKind::Model
        } else {
            NodeKind::Node
        }
    }
}
