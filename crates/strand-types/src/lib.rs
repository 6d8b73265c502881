pub mod config;
pub mod events;
pub mod state;

pub use config::StreamConfig;
pub use events::{Citation, ErrorCategory, GeneratedFile, NodeKind, RunStatus, StreamEvent};
pub use state::{AgentState, TimelineEntry, TimelineEventType};
