//! Purpose: Define the local service facade over a feedback store.
//! Exports: `Board` and `ApiResult`.
//! Role: Stable boundary shared by the CLI, the HTTP server, and tests.
//! Invariants: Submissions are validated before anything is stored.
//! Invariants: Listings are newest first with ids breaking timestamp ties.
#![allow(clippy::result_large_err)]

use crate::core::error::Error;
use crate::core::record::{FeedbackPage, FeedbackRecord};
use crate::core::store::{open_store, FeedbackStore};
use crate::core::validate::validate_message;
use std::path::Path;
use std::sync::Arc;

pub type ApiResult<T> = Result<T, Error>;

#[derive(Clone)]
pub struct Board {
    store: Arc<dyn FeedbackStore>,
}

impl Board {
    /// Open the board backed by the store at `path` (`:memory:` selects the
    /// ephemeral backend).
    pub fn open(path: impl AsRef<Path>) -> ApiResult<Self> {
        Ok(Self {
            store: open_store(path.as_ref())?,
        })
    }

    /// Wrap an already-opened store.
    pub fn with_store(store: Arc<dyn FeedbackStore>) -> Self {
        Self { store }
    }

    /// Validate and persist one submission. The trimmed message is stored.
    pub fn submit(&self, message: Option<&str>) -> ApiResult<FeedbackRecord> {
        let trimmed = validate_message(message)?;
        self.store.append(trimmed)
    }

    /// Every stored record, newest first.
    pub fn list(&self) -> ApiResult<FeedbackPage> {
        Ok(FeedbackPage::from_records(self.store.list()?))
    }
}
