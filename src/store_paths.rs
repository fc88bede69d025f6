//! Purpose: Shared default location for the on-disk feedback journal.
//! Exports: `default_store_path`.
//! Role: Keep CLI and server store resolution aligned from one source.
//! Invariants: Default store path remains `~/.corkboard/feedback.jsonl`.

use std::path::PathBuf;

pub fn default_store_path() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".corkboard").join("feedback.jsonl")
}
