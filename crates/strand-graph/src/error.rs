use strand_types::{ErrorCategory, StreamEvent};
use thiserror::Error;

/// Failure surfaced to the transport after the stream has been finalized
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("upstream agent execution failed: {cause}")]
    Upstream {
        category: ErrorCategory,
        cause: anyhow::Error,
    },
}

impl StreamError {
    pub fn upstream(cause: anyhow::Error) -> Self {
        Self::Upstream {
            category: classify_error(&cause),
            cause,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Upstream { category, .. } => *category,
        }
    }

    /// The underlying engine error, for logs only
    pub fn cause(&self) -> &anyhow::Error {
        match self {
            Self::Upstream { cause, .. } => cause,
        }
    }

    /// Client-safe `error` event; never contains provider text
    pub fn to_event(&self) -> StreamEvent {
        let category = self.category();
        StreamEvent::Error {
            message: category.user_message().to_string(),
            category,
        }
    }
}

const CONTEXT_TOO_LONG: &[&str] = &[
    "context_length_exceeded",
    "maximum context length",
    "context window",
    "too many tokens",
    "prompt is too long",
];

const CONTENT_FILTERED: &[&str] = &[
    "content_filter",
    "content management policy",
    "content policy",
    "safety system",
];

const RATE_LIMITED: &[&str] = &["rate limit", "rate_limit", "429", "too many requests"];

const AUTHENTICATION: &[&str] = &[
    "401",
    "invalid api key",
    "invalid_api_key",
    "incorrect api key",
    "unauthorized",
    "authentication",
];

/// Map an engine failure to a user-facing category by inspecting the
/// whole error chain
pub fn classify_error(err: &anyhow::Error) -> ErrorCategory {
    let text = err
        .chain()
        .map(|cause| cause.to_string().to_lowercase())
        .collect::<Vec<_>>()
        .join(" | ");

    let matches = |patterns: &[&str]| patterns.iter().any(|p| text.contains(p));

    if matches(CONTEXT_TOO_LONG) {
        ErrorCategory::ContextTooLong
    } else if matches(CONTENT_FILTERED) {
        ErrorCategory::ContentFiltered
    } else if matches(RATE_LIMITED) {
        ErrorCategory::RateLimited
    } else if matches(AUTHENTICATION) {
        ErrorCategory::AuthenticationFailed
    } else {
        ErrorCategory::Generic
    }
}
