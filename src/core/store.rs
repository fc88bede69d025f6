// Storage capability behind the board. Implementations stamp ids and
// timestamps; callers never supply either.
use crate::core::error::Error;
use crate::core::journal::Journal;
use crate::core::memory::MemoryStore;
use crate::core::record::FeedbackRecord;
use std::path::Path;
use std::sync::Arc;

/// Reserved store path selecting the ephemeral in-memory backend.
pub const MEMORY_STORE_PATH: &str = ":memory:";

pub trait FeedbackStore: Send + Sync {
    /// Persist one record with the next id and the current UTC instant.
    fn append(&self, message: &str) -> Result<FeedbackRecord, Error>;

    /// All records in insertion order.
    fn list(&self) -> Result<Vec<FeedbackRecord>, Error>;
}

/// Open the backend named by `path`: the JSONL journal, or the in-memory
/// store when the path is exactly `:memory:`.
pub fn open_store(path: &Path) -> Result<Arc<dyn FeedbackStore>, Error> {
    if path.as_os_str() == MEMORY_STORE_PATH {
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(Journal::open(path)?))
}
