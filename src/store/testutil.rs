//! In-memory stub adapter for store tests
//!
//! Keeps rows in plain vectors and counts writes, so tests can assert that
//! validation failures and no-op moves never reach the backend. With
//! `reject_positions` set it simulates an un-migrated backend whose
//! capability report is stale: it claims full support but rejects any
//! write carrying a canvas position with a missing-column error.

use crate::database::models::{
    InsertConnectionRequest, InsertNoteRequest, NoteConnection, NotePatch, Placement, ScopeFilter,
    StickyNote,
};
use crate::error::{AppError, Result};
use crate::store::adapter::{BackendAdapter, BackendCapabilities};
use chrono::Utc;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    notes: RefCell<Vec<StickyNote>>,
    connections: RefCell<Vec<NoteConnection>>,
    reject_positions: Cell<bool>,
    note_writes: Cell<usize>,
    connection_writes: Cell<usize>,
}

#[derive(Clone, Default)]
pub struct MemoryAdapter {
    inner: Rc<Inner>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_positions() -> Self {
        let adapter = Self::default();
        adapter.inner.reject_positions.set(true);
        adapter
    }

    pub fn note_writes(&self) -> usize {
        self.inner.note_writes.get()
    }

    pub fn connection_writes(&self) -> usize {
        self.inner.connection_writes.get()
    }

    /// Seed a note directly, bypassing write counting.
    pub fn seed_note(&self, calendar_id: &str, text: &str, placement: Placement) -> StickyNote {
        let now = Utc::now();
        let note = StickyNote {
            id: Uuid::new_v4().to_string(),
            calendar_id: calendar_id.to_string(),
            owner_id: "user-1".to_string(),
            placement,
            text: text.to_string(),
            color: Default::default(),
            is_struck: false,
            sort_order: None,
            created_at: now,
            updated_at: now,
        };
        self.inner.notes.borrow_mut().push(note.clone());
        note
    }

    fn position_rejection(&self, placement: &Placement) -> Result<()> {
        if self.inner.reject_positions.get() && matches!(placement, Placement::Canvas { .. }) {
            return Err(AppError::SchemaMismatch {
                column: "position_x".to_string(),
            });
        }
        Ok(())
    }
}

fn in_scope(note: &StickyNote, scope: &ScopeFilter) -> bool {
    scope
        .calendar_id
        .as_ref()
        .map_or(true, |c| &note.calendar_id == c)
        && scope.owner_id.as_ref().map_or(true, |o| &note.owner_id == o)
}

impl BackendAdapter for MemoryAdapter {
    async fn capabilities(&self) -> Result<BackendCapabilities> {
        // Deliberately optimistic when reject_positions is set, so the
        // store's mismatch-retry path gets exercised.
        Ok(BackendCapabilities::full())
    }

    async fn list_notes(&self, scope: &ScopeFilter) -> Result<Vec<StickyNote>> {
        Ok(self
            .inner
            .notes
            .borrow()
            .iter()
            .filter(|n| in_scope(n, scope))
            .cloned()
            .collect())
    }

    async fn insert_note(&self, req: InsertNoteRequest) -> Result<StickyNote> {
        self.position_rejection(&req.placement)?;
        self.inner.note_writes.set(self.inner.note_writes.get() + 1);

        let now = Utc::now();
        let note = StickyNote {
            id: Uuid::new_v4().to_string(),
            calendar_id: req.calendar_id,
            owner_id: req.owner_id,
            placement: req.placement,
            text: req.text,
            color: req.color,
            is_struck: false,
            sort_order: req.sort_order,
            created_at: now,
            updated_at: now,
        };
        self.inner.notes.borrow_mut().push(note.clone());
        Ok(note)
    }

    async fn update_note(&self, id: &str, patch: NotePatch) -> Result<StickyNote> {
        if let Some(placement) = &patch.placement {
            self.position_rejection(placement)?;
        }
        self.inner.note_writes.set(self.inner.note_writes.get() + 1);

        let mut notes = self.inner.notes.borrow_mut();
        let note = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| AppError::NoteNotFound(id.to_string()))?;

        if let Some(text) = patch.text {
            note.text = text;
        }
        if let Some(color) = patch.color {
            note.color = color;
        }
        if let Some(is_struck) = patch.is_struck {
            note.is_struck = is_struck;
        }
        if let Some(placement) = patch.placement {
            note.placement = placement;
        }
        if let Some(calendar_id) = patch.calendar_id {
            note.calendar_id = calendar_id;
        }
        if let Some(sort_order) = patch.sort_order {
            note.sort_order = Some(sort_order);
        }
        note.updated_at = Utc::now();

        Ok(note.clone())
    }

    async fn delete_note(&self, id: &str) -> Result<()> {
        self.inner.note_writes.set(self.inner.note_writes.get() + 1);

        let mut notes = self.inner.notes.borrow_mut();
        let before = notes.len();
        notes.retain(|n| n.id != id);
        if notes.len() == before {
            return Err(AppError::NoteNotFound(id.to_string()));
        }
        // Mirror the SQLite schema's referential cascade
        self.inner
            .connections
            .borrow_mut()
            .retain(|c| !c.touches(id));
        Ok(())
    }

    async fn list_connections(&self, scope: &ScopeFilter) -> Result<Vec<NoteConnection>> {
        Ok(self
            .inner
            .connections
            .borrow()
            .iter()
            .filter(|c| {
                scope
                    .calendar_id
                    .as_ref()
                    .map_or(true, |cal| &c.calendar_id == cal)
            })
            .cloned()
            .collect())
    }

    async fn insert_connection(&self, req: InsertConnectionRequest) -> Result<NoteConnection> {
        self.inner
            .connection_writes
            .set(self.inner.connection_writes.get() + 1);

        let connection = NoteConnection {
            id: Uuid::new_v4().to_string(),
            calendar_id: req.calendar_id,
            source_note_id: req.source_note_id,
            target_note_id: req.target_note_id,
            created_at: Utc::now(),
        };
        self.inner.connections.borrow_mut().push(connection.clone());
        Ok(connection)
    }

    async fn delete_connection(&self, id: &str) -> Result<()> {
        self.inner
            .connection_writes
            .set(self.inner.connection_writes.get() + 1);

        let mut connections = self.inner.connections.borrow_mut();
        let before = connections.len();
        connections.retain(|c| c.id != id);
        if connections.len() == before {
            return Err(AppError::ConnectionNotFound(id.to_string()));
        }
        Ok(())
    }
}
