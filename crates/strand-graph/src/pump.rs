use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use strand_llm::Message;
use strand_persist::{RunRecorder, RunSummary, RunTokenUsage};
use strand_types::{RunStatus, StreamConfig, StreamEvent};

use crate::context::StreamContext;
use crate::error::StreamError;
use crate::handlers::{self, MessagesModeHandler, UpdatesModeHandler};
use crate::history::HistoryIndexer;
use crate::tracer::ExecutionTracer;
use crate::upstream::{RawChunk, UpstreamChunk};

/// Client protocol stream: events, then at most one trailing error
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, StreamError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Idle,
    AgentRunning,
    Finalizing,
    Done,
}

impl PumpState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AgentRunning => "agent_running",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
        }
    }
}

fn advance(state: &mut PumpState, next: PumpState, run_id: &str) {
    tracing::debug!(run_id = %run_id, from = state.as_str(), to = next.as_str(), "Pump state");
    *state = next;
}

/// Drives one streaming request from upstream chunks to client events
///
/// # Example
///
/// ```ignore
/// let pump = StreamPump::new(Arc::new(StreamConfig::default()))
///     .with_recorder(store.clone());
///
/// let mut events = pump.run(history, upstream);
/// while let Some(event) = events.next().await {
///     match event {
///         Ok(event) => send(event).await?,
///         Err(e) => send(e.to_event()).await?,
///     }
/// }
/// ```
pub struct StreamPump {
    config: Arc<StreamConfig>,
    recorder: Option<Arc<dyn RunRecorder>>,
    run_id: String,
    stream_id: String,
}

impl StreamPump {
    pub fn new(config: Arc<StreamConfig>) -> Self {
        Self {
            config,
            recorder: None,
            run_id: uuid::Uuid::new_v4().to_string(),
            stream_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn RunRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_stream_id(mut self, stream_id: impl Into<String>) -> Self {
        self.stream_id = stream_id.into();
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Translate `upstream` for a conversation whose prior turns are
    /// `history`
    ///
    /// Finalization always runs once the upstream ends or fails: every open
    /// span is closed and the run is persisted before an upstream error is
    /// surfaced as the last item. Nothing runs in the background, so a
    /// consumer that drops the stream early simply stops the run.
    pub fn run<S>(self, history: Vec<Message>, upstream: S) -> EventStream
    where
        S: Stream<Item = anyhow::Result<RawChunk>> + Send + 'static,
    {
        let Self {
            config,
            recorder,
            run_id,
            stream_id,
        } = self;

        Box::pin(async_stream::stream! {
            let mut state = PumpState::Idle;
            let mut ctx = StreamContext::new(stream_id.clone());
            HistoryIndexer::seed(&history, &mut ctx);

            let mut tracer = ExecutionTracer::new(run_id.clone());
            let updates = UpdatesModeHandler::new(Arc::clone(&config));
            let messages = MessagesModeHandler::new(Arc::clone(&config));

            yield Ok(StreamEvent::Processing { stream_id: stream_id.clone() });

            if let Some(event) = tracer.on_agent_start(&stream_id) {
                ctx.agent_started = true;
                yield Ok(event);
            }
            advance(&mut state, PumpState::AgentRunning, &run_id);

            let mut captured: Option<anyhow::Error> = None;
            let mut upstream = Box::pin(upstream);

            while let Some(item) = upstream.next().await {
                let chunk = match item {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        tracing::error!(run_id = %run_id, error = %e, "Upstream execution failed");
                        captured = Some(e);
                        break;
                    }
                };

                let events = match chunk.decode() {
                    Ok(UpstreamChunk::Updates(step_updates)) => {
                        updates.handle(&step_updates, &mut ctx, &mut tracer)
                    }
                    Ok(UpstreamChunk::Messages { fragment, metadata }) => {
                        messages.handle(&fragment, &metadata, &mut ctx, &mut tracer)
                    }
                    Err(e) => {
                        tracing::warn!(run_id = %run_id, error = %e, "Dropping malformed upstream chunk");
                        continue;
                    }
                };

                for event in events {
                    yield Ok(event);
                }

                if config.incremental_timeline {
                    if let Some(recorder) = &recorder {
                        record_pending(recorder.as_ref(), &run_id, &mut tracer).await;
                    }
                }
            }

            advance(&mut state, PumpState::Finalizing, &run_id);

            let status = if captured.is_some() {
                RunStatus::Failed
            } else {
                RunStatus::Completed
            };
            let finals = finalize(&mut ctx, &mut tracer, status);

            if let Some(recorder) = &recorder {
                persist_run(recorder.as_ref(), &ctx, &mut tracer, status).await;
            }

            for event in finals {
                yield Ok(event);
            }

            advance(&mut state, PumpState::Done, &run_id);
            tracing::info!(
                run_id = %run_id,
                status = status.as_str(),
                chunks = ctx.token_count,
                duration_ms = tracer.duration_ms(),
                "Stream finished"
            );

            if let Some(e) = captured {
                yield Err(StreamError::upstream(e));
            }
        })
    }
}

/// Close every open span
///
/// Order: the running node's `node_end`, then the thinking flush, then the
/// streaming flush carrying the agent state, then usage and `agent_end`.
/// Mid-stream node transitions close thinking before `node_end` instead.
fn finalize(ctx: &mut StreamContext, tracer: &mut ExecutionTracer, status: RunStatus) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    handlers::end_node(ctx, tracer, status, &mut events);
    events.extend(ctx.thinking_end());

    ctx.agent_state = Some(tracer.get_agent_state());
    events.extend(ctx.streaming_end());
    events.extend(ctx.token_usage_event());
    if ctx.agent_started {
        events.extend(tracer.on_agent_end(status));
    }

    events
}

async fn record_pending(recorder: &dyn RunRecorder, run_id: &str, tracer: &mut ExecutionTracer) {
    let entries = tracer.take_unpersisted();
    if entries.is_empty() {
        return;
    }

    if let Err(e) = recorder.record_timeline_entries(run_id, &entries).await {
        tracing::error!(run_id = %run_id, error = %e, "Failed to record timeline entries");
    }
}

async fn persist_run(recorder: &dyn RunRecorder, ctx: &StreamContext, tracer: &mut ExecutionTracer, status: RunStatus) {
    let run_id = tracer.run_id().to_string();
    record_pending(recorder, &run_id, tracer).await;

    let summary = RunSummary {
        status,
        started_at: tracer.started_at(),
        ended_at: chrono::Utc::now(),
        duration_ms: tracer.duration_ms(),
        node_data: ctx.agent_state.clone().unwrap_or_default(),
        token_usage: ctx.has_token_usage().then(|| RunTokenUsage {
            input_tokens: ctx.total_input_tokens,
            output_tokens: ctx.total_output_tokens,
            total_tokens: ctx.total_tokens,
        }),
    };

    match recorder.finalize_run(&run_id, summary).await {
        Ok(()) => tracing::debug!(run_id = %run_id, "Run finalized"),
        Err(e) => tracing::error!(run_id = %run_id, error = %e, "Failed to finalize run"),
    }
}

/// Fold the trailing error into the protocol as a single `error` event
pub fn into_client_events(stream: EventStream) -> Pin<Box<dyn Stream<Item = StreamEvent> + Send>> {
    Box::pin(stream.map(|item| match item {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(category = ?e.category(), "Surfacing upstream failure to client");
            e.to_event()
        }
    }))
}
