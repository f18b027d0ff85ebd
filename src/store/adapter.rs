//! Backend adapter contract
//!
//! The stores call into this abstract CRUD interface instead of a concrete
//! backend. In production the adapter is the SQLite [`Repository`]; tests
//! plug in stubs to exercise failure and degradation paths.
//!
//! [`Repository`]: crate::database::Repository

use crate::database::models::{
    InsertConnectionRequest, InsertNoteRequest, NoteConnection, NotePatch, ScopeFilter, StickyNote,
};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Which optional features the backend schema supports.
///
/// Negotiated once (the repository probes its schema at startup) instead of
/// pattern-matching error strings at every call site. A stale report is
/// still safe: a write rejected with `SchemaMismatch` downgrades the cached
/// flags in the note store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackendCapabilities {
    /// Backend stores free-form canvas positions for undated notes.
    pub canvas_positions: bool,
    /// Backend stores manual inbox ordering.
    pub sort_order: bool,
}

impl BackendCapabilities {
    /// Capabilities of a fully migrated backend.
    pub fn full() -> Self {
        Self {
            canvas_positions: true,
            sort_order: true,
        }
    }
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// Abstract CRUD contract for note and connection persistence.
///
/// Every call suspends at the network/database boundary and returns either
/// the persisted row state or a structured error. Stores only commit their
/// local caches after a call resolves successfully.
#[allow(async_fn_in_trait)]
pub trait BackendAdapter {
    async fn capabilities(&self) -> Result<BackendCapabilities>;

    async fn list_notes(&self, scope: &ScopeFilter) -> Result<Vec<StickyNote>>;
    async fn insert_note(&self, req: InsertNoteRequest) -> Result<StickyNote>;
    async fn update_note(&self, id: &str, patch: NotePatch) -> Result<StickyNote>;
    async fn delete_note(&self, id: &str) -> Result<()>;

    async fn list_connections(&self, scope: &ScopeFilter) -> Result<Vec<NoteConnection>>;
    async fn insert_connection(&self, req: InsertConnectionRequest) -> Result<NoteConnection>;
    async fn delete_connection(&self, id: &str) -> Result<()>;
}
