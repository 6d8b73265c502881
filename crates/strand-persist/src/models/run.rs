use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strand_types::{AgentState, RunStatus};

/// Terminal record of one agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Final merged node data (outputs, order, display names)
    pub node_data: AgentState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<RunTokenUsage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}
