use futures::StreamExt;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use strand_graph::{into_client_events, StreamPump};
use strand_persist::InMemoryRunStore;
use strand_replay::replay::chunk_stream;
use strand_types::{ErrorCategory, RunStatus, StreamConfig, StreamEvent};

fn recording(lines: &[serde_json::Value]) -> Cursor<Vec<u8>> {
    let text = lines.iter().map(|l| l.to_string()).collect::<Vec<_>>().join("\n");
    Cursor::new(text.into_bytes())
}

#[tokio::test]
async fn test_replay_recorded_tool_run() {
    let lines = [
        json!(["messages", [{"type": "AIMessageChunk", "content": "", "additional_kwargs": {"reasoning_content": "Need the weather."}}, {"langgraph_node": "agent"}]]),
        json!(["updates", {"agent": {"messages": [{"type": "ai", "content": "", "tool_calls": [{"id": "call_1", "name": "get_weather", "args": {"city": "Lisbon"}}]}]}}]),
        json!(["updates", {"tools": {"messages": [{"type": "tool", "tool_call_id": "call_1", "name": "get_weather", "content": "22C and sunny"}]}}]),
        json!({"mode": "messages", "payload": [{"type": "AIMessageChunk", "content": "It is 22C "}, {"langgraph_node": "agent"}]}),
        json!({"mode": "messages", "payload": [{"type": "AIMessageChunk", "content": "in Lisbon.", "usage_metadata": {"input_tokens": 50, "output_tokens": 8, "total_tokens": 58}}, {"langgraph_node": "agent"}]}),
        json!(["updates", {"agent": {"messages": [{"type": "ai", "content": "It is 22C in Lisbon.", "additional_kwargs": {"citations": [{"url": "https://weather.example/lisbon"}]}}]}}]),
    ];

    let store = Arc::new(InMemoryRunStore::new());
    let pump = StreamPump::new(Arc::new(StreamConfig::default()))
        .with_run_id("replay-1")
        .with_recorder(store.clone());

    let events: Vec<StreamEvent> = into_client_events(pump.run(vec![], chunk_stream(recording(&lines))))
        .collect()
        .await;
    let kinds: Vec<&str> = events.iter().map(StreamEvent::kind).collect();

    assert_eq!(
        kinds,
        vec![
            "processing",
            "agent_start",
            "node_start",
            "thinking_start",
            "thinking_chunk",
            "tool_call_request",
            "tool_call_response",
            "thinking_end",
            "streaming_start",
            "streaming_chunk",
            "streaming_chunk",
            "citations",
            "node_end",
            "streaming_end",
            "token_usage",
            "agent_end",
        ]
    );
    assert_eq!(
        events[6],
        StreamEvent::ToolCallResponse {
            id: "call_1".into(),
            name: Some("get_weather".into()),
            result: "22C and sunny".into(),
            is_error: false,
        }
    );

    let summary = store.summary("replay-1").await.unwrap();
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.node_data.node_outputs["agent"], "It is 22C in Lisbon.");
    assert_eq!(summary.token_usage.map(|u| u.total_tokens), Some(58));
}

#[tokio::test]
async fn test_replay_recorded_failure() {
    let lines = [
        json!(["messages", [{"type": "AIMessageChunk", "content": "Partial"}, {"node": "agent"}]]),
        json!({"error": "This model's maximum context length is 128000 tokens"}),
    ];

    let pump = StreamPump::new(Arc::new(StreamConfig::default()));
    let events: Vec<StreamEvent> = into_client_events(pump.run(vec![], chunk_stream(recording(&lines))))
        .collect()
        .await;

    assert!(matches!(
        events.last(),
        Some(StreamEvent::Error { category: ErrorCategory::ContextTooLong, .. })
    ));
    assert!(events
        .iter()
        .any(|e| matches!(e, StreamEvent::AgentEnd { status: RunStatus::Failed, .. })));
}
