//! Prelude module for convenient imports
//!
//! Import everything you need with:
//! ```rust
//! use strand::prelude::*;
//! ```

pub use crate::{
    into_client_events, StreamPump, StreamError, RawChunk,
    Message, Content, ToolCall,
    StreamEvent, StreamConfig, RunStatus, AgentState,
    RunRecorder, InMemoryRunStore, RunSummary,
};
