pub mod types;

pub use types::{
    AiMessage, Content, ContentPart, Message, ToolCall, ToolMessage, UsageMetadata,
};
