use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use strand_types::TimelineEntry;
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::models::RunSummary;
use crate::trait_client::RunRecorder;

#[derive(Debug, Default)]
struct StoredRun {
    timeline: BTreeMap<u64, TimelineEntry>,
    summary: Option<RunSummary>,
}

/// Process-local run store, used by the replay binary and tests
#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    runs: RwLock<HashMap<String, StoredRun>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeline of a run ordered by sequence
    pub async fn timeline(&self, run_id: &str) -> Vec<TimelineEntry> {
        self.runs
            .read()
            .await
            .get(run_id)
            .map(|run| run.timeline.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn summary(&self, run_id: &str) -> Option<RunSummary> {
        self.runs
            .read()
            .await
            .get(run_id)
            .and_then(|run| run.summary.clone())
    }

    pub async fn run_count(&self) -> usize {
        self.runs.read().await.len()
    }
}

#[async_trait]
impl RunRecorder for InMemoryRunStore {
    async fn record_timeline_entries(&self, run_id: &str, entries: &[TimelineEntry]) -> Result<()> {
        let mut runs = self.runs.write().await;
        let run = runs.entry(run_id.to_string()).or_default();

        for entry in entries {
            // first write wins
            run.timeline.entry(entry.sequence).or_insert_with(|| entry.clone());
        }

        tracing::debug!(run_id, count = entries.len(), "Recorded timeline entries");
        Ok(())
    }

    async fn finalize_run(&self, run_id: &str, summary: RunSummary) -> Result<()> {
        let mut runs = self.runs.write().await;
        let run = runs.entry(run_id.to_string()).or_default();

        if run.summary.is_some() {
            return Err(PersistError::AlreadyFinalized(run_id.to_string()));
        }
        run.summary = Some(summary);

        tracing::debug!(run_id, "Finalized run");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use strand_types::{AgentState, RunStatus, TimelineEventType};

    fn entry(sequence: u64, event_type: TimelineEventType) -> TimelineEntry {
        TimelineEntry {
            sequence,
            event_type,
            node_id: None,
            node_name: None,
            node_kind: None,
            timestamp: Utc::now(),
            output: None,
            status: None,
        }
    }

    fn summary(status: RunStatus) -> RunSummary {
        RunSummary {
            status,
            started_at: Utc::now(),
            ended_at: Utc::now(),
            duration_ms: 5,
            node_data: AgentState::default(),
            token_usage: None,
        }
    }

    #[tokio::test]
    async fn test_appends_are_idempotent_by_sequence() {
        let store = InMemoryRunStore::new();
        let first = vec![
            entry(0, TimelineEventType::AgentStart),
            entry(1, TimelineEventType::NodeStart),
        ];
        let second = vec![
            entry(1, TimelineEventType::NodeEnd),
            entry(2, TimelineEventType::AgentEnd),
        ];

        store.record_timeline_entries("run_1", &first).await.unwrap();
        store.record_timeline_entries("run_1", &second).await.unwrap();

        let timeline = store.timeline("run_1").await;
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline[1].event_type, TimelineEventType::NodeStart);
        assert_eq!(timeline[2].event_type, TimelineEventType::AgentEnd);
    }

    #[tokio::test]
    async fn test_finalize_only_once() {
        let store = InMemoryRunStore::new();

        store.finalize_run("run_1", summary(RunStatus::Completed)).await.unwrap();
        let err = store.finalize_run("run_1", summary(RunStatus::Failed)).await;

        assert!(matches!(err, Err(PersistError::AlreadyFinalized(_))));
        assert_eq!(store.summary("run_1").await.unwrap().status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_runs_are_isolated() {
        let store = InMemoryRunStore::new();
        store
            .record_timeline_entries("a", &[entry(0, TimelineEventType::AgentStart)])
            .await
            .unwrap();

        assert!(store.timeline("b").await.is_empty());
        assert!(store.summary("a").await.is_none());
        assert_eq!(store.run_count().await, 1);
    }
}
