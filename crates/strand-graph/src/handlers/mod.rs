//! Reducers for the two upstream channels
//!
//! Both handlers mutate the same `StreamContext` and `ExecutionTracer` and
//! return the client events produced by one chunk, in order.

mod messages;
mod updates;

pub use messages::MessagesModeHandler;
pub use updates::UpdatesModeHandler;

use strand_types::{NodeKind, RunStatus, StreamConfig, StreamEvent};

use crate::context::StreamContext;
use crate::tracer::ExecutionTracer;

fn node_kind(config: &StreamConfig, ctx: &StreamContext, node_id: &str) -> NodeKind {
    if ctx.is_structured_node(node_id) {
        NodeKind::StructuredOutput
    } else {
        config.node_kind(node_id)
    }
}

/// End the running node, if any, with the text buffered for it
pub(crate) fn end_node(
    ctx: &mut StreamContext,
    tracer: &mut ExecutionTracer,
    status: RunStatus,
    events: &mut Vec<StreamEvent>,
) {
    let Some(node_id) = tracer.current_node().map(str::to_string) else {
        return;
    };

    let output = ctx.take_node_output();
    events.extend(tracer.on_node_end(&node_id, status, output));
}

/// Leave the running node mid-stream; its open thinking span closes first
fn close_node(ctx: &mut StreamContext, tracer: &mut ExecutionTracer, events: &mut Vec<StreamEvent>) {
    if tracer.current_node().is_some() {
        events.extend(ctx.thinking_end());
    }
    end_node(ctx, tracer, RunStatus::Completed, events);
}

/// Close the running node and open `node_id`
pub(crate) fn enter_node(
    config: &StreamConfig,
    ctx: &mut StreamContext,
    tracer: &mut ExecutionTracer,
    node_id: &str,
    events: &mut Vec<StreamEvent>,
) {
    if tracer.current_node() == Some(node_id) {
        return;
    }

    close_node(ctx, tracer, events);

    let name = config.display_name(node_id);
    let kind = node_kind(config, ctx, node_id);
    events.extend(tracer.on_node_start(node_id, &name, kind));
}
