//! Recorded-stream input for the replay binary
//!
//! A recording is JSON lines, one upstream chunk per line, in any of these
//! shapes:
//!
//! ```text
//! {"mode": "messages", "payload": [{"type": "AIMessageChunk", "content": "Hi"}, {"langgraph_node": "agent"}]}
//! ["updates", {"agent": {"messages": [...]}}]
//! {"error": "Error code: 429 - rate limit"}
//! ```
//!
//! The last form replays an engine failure at that point of the run.

use anyhow::{anyhow, Context, Result};
use futures::Stream;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use strand_graph::RawChunk;
use strand_llm::Message;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordedLine {
    Tuple(String, Value),
    Chunk(RawChunk),
    Failure { error: String },
}

/// Parse one recorded line; `Ok(None)` for blank lines
pub fn parse_line(line: &str) -> Result<Option<Result<RawChunk>>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let recorded: RecordedLine = serde_json::from_str(line).context("invalid recorded chunk")?;
    Ok(Some(match recorded {
        RecordedLine::Chunk(chunk) => Ok(chunk),
        RecordedLine::Tuple(mode, payload) => Ok(RawChunk::new(mode, payload)),
        RecordedLine::Failure { error } => Err(anyhow!(error)),
    }))
}

/// Upstream stream over a JSON-lines recording
///
/// Lines that are not valid JSON are logged and skipped. Reading stops at
/// the first replayed failure, like a real engine would.
pub fn chunk_stream<R>(reader: R) -> impl Stream<Item = Result<RawChunk>> + Send + 'static
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async_stream::stream! {
        let mut lines = reader.lines();
        let mut line_no = 0usize;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    yield Err(anyhow!(e).context("failed to read recording"));
                    break;
                }
            };
            line_no += 1;

            match parse_line(&line) {
                Ok(None) => continue,
                Ok(Some(Ok(chunk))) => yield Ok(chunk),
                Ok(Some(Err(e))) => {
                    yield Err(e);
                    break;
                }
                Err(e) => tracing::warn!(line = line_no, error = %e, "Skipping unreadable line"),
            }
        }
    }
}

/// Prior conversation turns, as a JSON array or JSON lines
pub async fn read_history(path: &Path) -> Result<Vec<Message>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read history from {}", path.display()))?;

    if raw.trim_start().starts_with('[') {
        return serde_json::from_str(&raw).context("invalid history array");
    }

    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid history message on line {}", i + 1))
        })
        .collect()
}
