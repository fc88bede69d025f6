//! Purpose: Shared library crate used by the `corkboard` CLI and tests.
//! Exports: `api` (stable boundary) and `core` (records, validation, stores, errors).
//! Role: Library backing the binary; `api` is the supported surface.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
pub(crate) mod store_paths;
