use strand_llm::{AiMessage, Content, ContentPart, Message, ToolCall, ToolMessage, UsageMetadata};
use serde_json::json;

#[test]
fn test_content_text_creation() {
    let content = Content::text("Hello, world!");
    assert_eq!(content.as_text(), Some("Hello, world!"));
}

#[test]
fn test_content_from_string() {
    let content: Content = "Test".into();
    assert_eq!(content.as_text(), Some("Test"));
}

#[test]
fn test_message_roles() {
    assert_eq!(Message::system("You are helpful").role(), "system");
    assert_eq!(Message::human("Hello").role(), "user");
    assert_eq!(Message::ai("Hi there!").role(), "assistant");
    assert_eq!(Message::ai_chunk("Hi").role(), "assistant");
    assert_eq!(Message::tool_result("call_123", "42").role(), "tool");
}

#[test]
fn test_ai_message_deserialization_with_tool_calls() {
    let json = json!({
        "type": "ai",
        "content": "",
        "tool_calls": [
            {"id": "call_1", "name": "search", "args": {"query": "rust"}, "type": "tool_call"}
        ],
        "id": "run-1"
    });

    let msg: Message = serde_json::from_value(json).unwrap();
    let ai = msg.as_ai().unwrap();

    assert!(!msg.is_chunk());
    assert!(ai.has_tool_calls());
    assert_eq!(ai.tool_calls[0].id, "call_1");
    assert_eq!(ai.tool_calls[0].name, "search");
    assert_eq!(ai.tool_calls[0].args["query"], "rust");
}

#[test]
fn test_tool_message_deserialization() {
    let json = json!({
        "type": "tool",
        "tool_call_id": "call_1",
        "content": "3 results",
        "name": "search",
        "status": "error"
    });

    let msg: Message = serde_json::from_value(json).unwrap();
    let tool = msg.as_tool().unwrap();

    assert_eq!(tool.tool_call_id, "call_1");
    assert_eq!(tool.name.as_deref(), Some("search"));
    assert!(tool.is_error());
    assert_eq!(msg.text(), "3 results");
}

#[test]
fn test_multipart_content_flattening() {
    let json = json!({
        "type": "ai",
        "content": [
            {"type": "thinking", "thinking": "Considering..."},
            {"type": "text", "text": "Part one, "},
            {"type": "text", "text": "part two."}
        ]
    });

    let msg: Message = serde_json::from_value(json).unwrap();
    let ai = msg.as_ai().unwrap();

    assert_eq!(ai.text(), "Part one, part two.");
    assert_eq!(ai.thinking(), "Considering...");
}

#[test]
fn test_message_serialization_tags() {
    let json = serde_json::to_string(&Message::ai_chunk("Hi")).unwrap();
    assert!(json.contains("\"type\":\"AIMessageChunk\""));

    let json = serde_json::to_string(&Message::human("Hi")).unwrap();
    assert!(json.contains("\"type\":\"human\""));
}

#[test]
fn test_tool_call_parse_arguments() {
    #[derive(serde::Deserialize)]
    struct Args {
        city: String,
    }

    let call = ToolCall::new("call_9", "get_weather", json!({"city": "NYC"}));
    let args: Args = call.parse_arguments().unwrap();
    assert_eq!(args.city, "NYC");
}

#[test]
fn test_ai_message_builders() {
    let ai = AiMessage::new(vec![ContentPart::Text { text: "x".to_string() }])
        .with_kwarg("structured_output", json!(true))
        .with_usage(UsageMetadata::new(3, 4));

    assert!(ai.flag("structured_output"));
    assert!(!ai.flag("missing"));
    assert_eq!(ai.usage().unwrap().total_tokens, 7);
}

#[test]
fn test_tool_message_default_is_success() {
    let tool = ToolMessage::new("call_1", "ok");
    assert!(!tool.is_error());
}
