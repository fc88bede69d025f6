// Ephemeral store for demos and tests. Same stamping rules as the journal.
use crate::core::error::Error;
use crate::core::record::FeedbackRecord;
use crate::core::store::FeedbackStore;
use std::sync::Mutex;
use time::OffsetDateTime;

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<FeedbackRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeedbackStore for MemoryStore {
    fn append(&self, message: &str) -> Result<FeedbackRecord, Error> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let id = records
            .iter()
            .map(|record| record.id)
            .max()
            .map_or(1, |id| id + 1);
        let record = FeedbackRecord {
            id,
            message: message.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        records.push(record.clone());
        Ok(record)
    }

    fn list(&self) -> Result<Vec<FeedbackRecord>, Error> {
        let records = self
            .records
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        Ok(records.clone())
    }
}
