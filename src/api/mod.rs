//! Purpose: Define the stable public Rust API boundary for Corkboard.
//! Exports: Board, RemoteClient, record types, and the error model.
//! Role: Public, additive-only surface used by the CLI, server, and tests.
//! Invariants: Everything the binary needs flows through this module.

mod board;
mod remote;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::journal::Journal;
pub use crate::core::memory::MemoryStore;
pub use crate::core::record::{FeedbackPage, FeedbackRecord};
pub use crate::core::store::{open_store, FeedbackStore, MEMORY_STORE_PATH};
pub use crate::core::validate::{
    validate_message, MAX_MESSAGE_CHARS, MESSAGE_REQUIRED, MESSAGE_TOO_LONG,
};
pub use crate::store_paths::default_store_path;
pub use board::{ApiResult, Board};
pub use remote::RemoteClient;
