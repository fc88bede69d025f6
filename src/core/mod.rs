// Core modules implementing storage, validation, and error modeling.
pub mod error;
pub mod journal;
pub mod memory;
pub mod record;
pub mod store;
pub mod validate;
