//! Store module
//!
//! Calendar-scoped stores that hold a local cache and write through the
//! backend adapter. Caches are committed strictly after a backend write is
//! acknowledged, never speculatively.

pub mod adapter;
pub mod connections;
pub mod notes;

pub use adapter::{BackendAdapter, BackendCapabilities};
pub use connections::{ConnectionStore, ToggleOutcome};
pub use notes::NoteStore;

#[cfg(test)]
pub(crate) mod testutil;
