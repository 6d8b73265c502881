use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::{Client, Collection};
use strand_types::TimelineEntry;

use crate::dbs::mongo::models::{MongoRun, MongoTimelineEntry};
use crate::error::{PersistError, Result};
use crate::models::RunSummary;
use crate::trait_client::RunRecorder;

/// AgentRun store backed by two collections: `agent_runs` and `agent_run_timeline`
#[derive(Clone)]
pub struct MongoRunStore {
    runs: Collection<Document>,
    timeline: Collection<MongoTimelineEntry>,
}

impl MongoRunStore {
    /// Connect to MongoDB and create client
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        Ok(Self::new(&client, database))
    }

    pub fn new(client: &Client, database: &str) -> Self {
        let db = client.database(database);
        Self {
            runs: db.collection("agent_runs"),
            timeline: db.collection("agent_run_timeline"),
        }
    }

    /// Timeline of a run ordered by sequence
    pub async fn get_timeline(&self, run_id: &str) -> Result<Vec<MongoTimelineEntry>> {
        let entries = self
            .timeline
            .find(doc! { "run_id": run_id })
            .sort(doc! { "sequence": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(entries)
    }
}

#[async_trait]
impl RunRecorder for MongoRunStore {
    async fn record_timeline_entries(&self, run_id: &str, entries: &[TimelineEntry]) -> Result<()> {
        for entry in entries {
            let record = MongoTimelineEntry::from_entry(run_id, entry);
            let update = doc! { "$setOnInsert": bson::to_document(&record)? };

            // Upsert keyed on (run_id, sequence) so retried flushes are no-ops
            self.timeline
                .update_one(record.key(), update)
                .upsert(true)
                .await?;
        }
        Ok(())
    }

    async fn finalize_run(&self, run_id: &str, summary: RunSummary) -> Result<()> {
        let record = MongoRun::from_summary(run_id, &summary)?;
        let update = doc! { "$set": bson::to_document(&record)? };

        self.runs
            .update_one(doc! { "run_id": run_id }, update)
            .upsert(true)
            .await?;
        Ok(())
    }
}
