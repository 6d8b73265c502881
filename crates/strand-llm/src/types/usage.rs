use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl UsageMetadata {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }

    /// Read the OpenAI-style `token_usage` block found in `response_metadata`
    pub fn from_token_usage(value: &Value) -> Option<Self> {
        let prompt = value.get("prompt_tokens").and_then(Value::as_u64);
        let completion = value.get("completion_tokens").and_then(Value::as_u64);
        if prompt.is_none() && completion.is_none() {
            return None;
        }

        let input_tokens = prompt.unwrap_or(0);
        let output_tokens = completion.unwrap_or(0);
        let total_tokens = value
            .get("total_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(input_tokens + output_tokens);

        Some(Self {
            input_tokens,
            output_tokens,
            total_tokens,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0 && self.total_tokens == 0
    }
}
