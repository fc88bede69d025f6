//! Purpose: Define the stored feedback record and the list envelope.
//! Exports: `FeedbackRecord`, `FeedbackPage`.
//! Role: Stable wire shapes shared by the store, HTTP server, CLI, and client.
//! Invariants: Fields mirror the HTTP JSON; `created_at` is RFC3339 UTC with a `Z` suffix.
//! Invariants: Pages list records newest first, ties broken by descending id.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: u64,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FeedbackPage {
    pub count: u64,
    pub results: Vec<FeedbackRecord>,
}

impl FeedbackPage {
    /// Build the list envelope from records in any order.
    pub fn from_records(mut records: Vec<FeedbackRecord>) -> Self {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Self {
            count: records.len() as u64,
            results: records,
        }
    }
}
