pub mod content;
pub mod message;
pub mod tool;
pub mod usage;

pub use content::{Content, ContentPart};
pub use message::{AiMessage, Message};
pub use tool::{ToolCall, ToolMessage};
pub use usage::UsageMetadata;
