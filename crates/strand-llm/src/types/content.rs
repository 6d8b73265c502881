use serde::{Deserialize, Serialize};

/// Message content as the engine serializes it
///
/// Either a plain string or a list of typed parts. Providers that expose
/// their reasoning inline put it in `thinking`/`reasoning` parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Simple text content
    Text(String),

    /// Multipart content (text mixed with thinking or provider-specific blocks)
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },

    Thinking {
        thinking: String,
    },

    Reasoning {
        reasoning: String,
    },

    /// Image blocks, citations blocks, anything we don't render as text
    #[serde(other)]
    Unknown,
}

impl Content {
    /// Create text content
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Get as plain text (if possible)
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Parts(parts) => {
                // If single text part, return it
                if let [ContentPart::Text { text }] = parts.as_slice() {
                    return Some(text);
                }
                None
            }
        }
    }

    /// Concatenate every text part into a single string
    ///
    /// Thinking and unknown parts are skipped.
    pub fn flatten_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Concatenate every thinking/reasoning part
    pub fn thinking_text(&self) -> String {
        match self {
            Self::Text(_) => String::new(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Thinking { thinking } => Some(thinking.as_str()),
                    ContentPart::Reasoning { reasoning } => Some(reasoning.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<ContentPart>> for Content {
    fn from(parts: Vec<ContentPart>) -> Self {
        Self::Parts(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_skips_thinking_parts() {
        let content = Content::Parts(vec![
            ContentPart::Thinking { thinking: "hmm".to_string() },
            ContentPart::Text { text: "Hello ".to_string() },
            ContentPart::Text { text: "world".to_string() },
        ]);

        assert_eq!(content.flatten_text(), "Hello world");
        assert_eq!(content.thinking_text(), "hmm");
    }

    #[test]
    fn test_unknown_parts_deserialize() {
        let content: Content = serde_json::from_value(json!([
            {"type": "image_url", "image_url": {"url": "http://x"}},
            {"type": "text", "text": "caption"}
        ]))
        .unwrap();

        assert_eq!(content.flatten_text(), "caption");
        assert_eq!(content.as_text(), None);
    }
}
