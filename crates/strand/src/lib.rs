//! # Strand
//!
//! Translates the execution stream of a multi-step AI agent into a single,
//! strictly ordered client event protocol, and records a replayable run
//! timeline on the side.
//!
//! ## Overview
//!
//! The upstream engine interleaves two channels over one stream:
//!
//! - **updates**: a full state snapshot per graph step
//! - **messages**: token deltas tagged with the node that produced them
//!
//! It also replays the whole conversation on every invocation. Strand merges
//! both channels, drops replayed history, separates reasoning from answer
//! text, pairs tool requests with results exactly once, and guarantees every
//! span it opens is closed, even when the engine fails midway.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::{stream, StreamExt};
//! use serde_json::json;
//! use std::sync::Arc;
//! use strand::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(InMemoryRunStore::new());
//!     let pump = StreamPump::new(Arc::new(StreamConfig::default()))
//!         .with_recorder(store.clone());
//!
//!     let history = vec![Message::human("Hi"), Message::ai("Hello there")];
//!     let chunk = RawChunk::messages(
//!         &Message::ai_chunk("How can I help?"),
//!         json!({"langgraph_node": "agent"}),
//!     )?;
//!     let upstream = stream::iter(vec![Ok::<_, anyhow::Error>(chunk)]);
//!
//!     let mut events = into_client_events(pump.run(history, upstream));
//!     while let Some(event) = events.next().await {
//!         println!("{}", serde_json::to_string(&event)?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`strand-graph`**: chunk decoding, the two channel handlers, the
//!   execution tracer and the stream pump
//! - **`strand-llm`**: the engine's message model
//! - **`strand-types`**: client events, timeline entries and configuration
//! - **`strand-persist`**: the run store boundary, in-memory and MongoDB
//!
//! ## License
//!
//! MIT

pub mod prelude;

pub use strand_graph::{
    classify_error, into_client_events, EventStream, ExecutionTracer, HistoryIndex, HistoryIndexer,
    MessagesModeHandler, PumpState, RawChunk, StreamContext, StreamError, StreamPump,
    UpdatesModeHandler, UpstreamChunk,
};

pub use strand_llm::{AiMessage, Content, ContentPart, Message, ToolCall, ToolMessage, UsageMetadata};

pub use strand_types::{
    AgentState, Citation, ErrorCategory, GeneratedFile, NodeKind, RunStatus, StreamConfig, StreamEvent,
    TimelineEntry, TimelineEventType,
};

pub use strand_persist::{InMemoryRunStore, PersistError, RunRecorder, RunSummary, RunTokenUsage};

#[cfg(feature = "mongodb")]
pub use strand_persist::MongoRunStore;
