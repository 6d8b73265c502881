use std::collections::HashSet;
use strand_llm::Message;

use crate::context::StreamContext;

/// Dedup sets derived from already-persisted conversation turns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryIndex {
    pub ai_contents: HashSet<String>,
    pub tool_call_ids: HashSet<String>,
}

/// Indexes prior turns so the engine's unconditional history replay can be
/// recognized and suppressed
pub struct HistoryIndexer;

impl HistoryIndexer {
    pub fn index(messages: &[Message]) -> HistoryIndex {
        let mut index = HistoryIndex::default();

        for message in messages {
            match message {
                Message::AI(ai) | Message::AIChunk(ai) => {
                    let text = ai.text();
                    if !text.is_empty() {
                        index.ai_contents.insert(text);
                    }
                    for call in &ai.tool_calls {
                        if !call.id.is_empty() {
                            index.tool_call_ids.insert(call.id.clone());
                        }
                    }
                }
                Message::Tool(tool) => {
                    index.tool_call_ids.insert(tool.tool_call_id.clone());
                }
                Message::System { .. } | Message::Human { .. } => {}
            }
        }

        index
    }

    /// Index `messages` and load the result into a fresh context
    pub fn seed(messages: &[Message], ctx: &mut StreamContext) {
        Self::index(messages).apply(ctx);
    }
}

impl HistoryIndex {
    /// Historical tool calls count as already resolved: their results are
    /// never emitted again.
    pub fn apply(self, ctx: &mut StreamContext) {
        tracing::debug!(
            ai_contents = self.ai_contents.len(),
            tool_calls = self.tool_call_ids.len(),
            "Seeded history dedup sets"
        );

        ctx.emitted_tool_result_ids
            .extend(self.tool_call_ids.iter().cloned());
        ctx.historical_tool_call_ids.extend(self.tool_call_ids);
        ctx.historical_ai_contents.extend(self.ai_contents);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strand_llm::{ContentPart, ToolCall};

    #[test]
    fn test_index_collects_ai_text_and_tool_ids() {
        let history = vec![
            Message::human("What's the weather?"),
            Message::ai_with_tools(vec![ToolCall::new("call_1", "weather", json!({"city": "Paris"}))]),
            Message::tool_result("call_1", "sunny"),
            Message::ai("It is sunny in Paris."),
        ];

        let index = HistoryIndexer::index(&history);

        assert!(index.ai_contents.contains("It is sunny in Paris."));
        assert!(!index.ai_contents.contains(""));
        assert!(index.tool_call_ids.contains("call_1"));
        assert_eq!(index.ai_contents.len(), 1);
    }

    #[test]
    fn test_multipart_content_is_flattened() {
        let history = vec![Message::ai(vec![
            ContentPart::Text { text: "Hello ".to_string() },
            ContentPart::Text { text: "there".to_string() },
        ])];

        let index = HistoryIndexer::index(&history);
        assert!(index.ai_contents.contains("Hello there"));
    }

    #[test]
    fn test_seed_marks_historical_results_emitted() {
        let history = vec![Message::ai_with_tools(vec![ToolCall::new("old", "search", json!({}))])];
        let mut ctx = StreamContext::new("s1");

        HistoryIndexer::seed(&history, &mut ctx);

        assert!(ctx.historical_tool_call_ids.contains("old"));
        assert!(ctx.emitted_tool_result_ids.contains("old"));
    }
}
