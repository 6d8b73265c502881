pub mod context;
pub mod error;
pub mod handlers;
pub mod history;
pub mod pump;
pub mod tracer;
pub mod upstream;

pub use context::StreamContext;
pub use error::{classify_error, StreamError};
pub use handlers::{MessagesModeHandler, UpdatesModeHandler};
pub use history::{HistoryIndex, HistoryIndexer};
pub use pump::{into_client_events, EventStream, PumpState, StreamPump};
pub use tracer::ExecutionTracer;
pub use upstream::{ChunkError, Metadata, RawChunk, StepPayload, StepUpdates, UpstreamChunk};

// Re-export key types from strand-types
pub use strand_types::{AgentState, ErrorCategory, RunStatus, StreamConfig, StreamEvent};
