use async_trait::async_trait;
use strand_types::TimelineEntry;

use crate::error::Result;
use crate::models::RunSummary;

/// The AgentRun store, as seen from the stream translator
///
/// Appends must be idempotent on `(run_id, entry.sequence)`: the same entry
/// may be offered twice when timeline flushing is incremental.
#[async_trait]
pub trait RunRecorder: Send + Sync {
    /// Append lifecycle entries to a run's timeline
    async fn record_timeline_entries(&self, run_id: &str, entries: &[TimelineEntry]) -> Result<()>;

    /// Write terminal status, timing and final node data
    async fn finalize_run(&self, run_id: &str, summary: RunSummary) -> Result<()>;
}
