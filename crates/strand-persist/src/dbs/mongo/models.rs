use mongodb::bson::{self, doc, Document};
use serde::{Deserialize, Serialize};
use strand_types::{RunStatus, TimelineEntry, TimelineEventType};

use crate::error::Result;
use crate::models::RunSummary;

/// Timeline document, unique on `(run_id, sequence)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTimelineEntry {
    pub run_id: String,
    pub sequence: i64,
    pub event_type: TimelineEventType,
    pub node_id: Option<String>,
    pub node_name: Option<String>,
    pub timestamp: bson::DateTime,
    pub output: Option<String>,
    pub status: Option<RunStatus>,
}

impl MongoTimelineEntry {
    pub fn from_entry(run_id: &str, entry: &TimelineEntry) -> Self {
        Self {
            run_id: run_id.to_string(),
            sequence: entry.sequence as i64,
            event_type: entry.event_type,
            node_id: entry.node_id.clone(),
            node_name: entry.node_name.clone(),
            timestamp: bson::DateTime::from_millis(entry.timestamp.timestamp_millis()),
            output: entry.output.clone(),
            status: entry.status,
        }
    }

    pub fn key(&self) -> Document {
        doc! { "run_id": &self.run_id, "sequence": self.sequence }
    }
}

/// Terminal fields written onto the run document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRun {
    pub run_id: String,
    pub status: RunStatus,
    pub started_at: bson::DateTime,
    pub ended_at: bson::DateTime,
    pub duration_ms: i64,
    pub node_data: Document,
    pub token_usage: Option<Document>,
}

impl MongoRun {
    pub fn from_summary(run_id: &str, summary: &RunSummary) -> Result<Self> {
        let token_usage = summary
            .token_usage
            .as_ref()
            .map(bson::to_document)
            .transpose()?;

        Ok(Self {
            run_id: run_id.to_string(),
            status: summary.status,
            started_at: bson::DateTime::from_millis(summary.started_at.timestamp_millis()),
            ended_at: bson::DateTime::from_millis(summary.ended_at.timestamp_millis()),
            duration_ms: summary.duration_ms as i64,
            node_data: bson::to_document(&summary.node_data)?,
            token_usage,
        })
    }
}
