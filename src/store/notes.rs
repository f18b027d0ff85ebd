//! Note store
//!
//! High-level business logic for sticky notes within one calendar context.
//! Holds the local cache and writes through to the backend adapter: local
//! state is only mutated after the backend acknowledges the write, so a
//! failed mutation leaves the calendar exactly as it was.

use crate::database::models::{
    InsertNoteRequest, NoteColor, NoteConnection, NotePatch, Placement, ScopeFilter, StickyNote,
};
use crate::error::{AppError, Result};
use crate::store::adapter::{BackendAdapter, BackendCapabilities};
use chrono::{Duration, NaiveDate};

/// Store for the notes of a single calendar.
pub struct NoteStore<A: BackendAdapter> {
    adapter: A,
    calendar_id: String,
    owner_id: String,
    capabilities: BackendCapabilities,
    notes: Vec<StickyNote>,
}

/// Downgrade the cached capability matching a missing column. Returns false
/// when nothing changed — either the column is not a known optional field
/// or the capability was already off — in which case dropping fields cannot
/// fix the write and the mismatch must surface. This bounds the retry loop
/// to one attempt per optional field.
fn downgrade_capability(caps: &mut BackendCapabilities, column: &str) -> bool {
    match column {
        "position_x" | "position_y" => {
            let changed = caps.canvas_positions;
            caps.canvas_positions = false;
            changed
        }
        "sort_order" => {
            let changed = caps.sort_order;
            caps.sort_order = false;
            changed
        }
        _ => false,
    }
}

impl<A: BackendAdapter> NoteStore<A> {
    /// Create a store scoped to one calendar, negotiating backend
    /// capabilities up front.
    pub async fn new(
        adapter: A,
        calendar_id: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Result<Self> {
        let capabilities = adapter.capabilities().await?;

        Ok(Self {
            adapter,
            calendar_id: calendar_id.into(),
            owner_id: owner_id.into(),
            capabilities,
            notes: Vec::new(),
        })
    }

    /// Create a store for an unauthenticated session. Notes are stamped
    /// with the shared guest owner id.
    pub async fn new_guest(adapter: A, calendar_id: impl Into<String>) -> Result<Self> {
        Self::new(adapter, calendar_id, crate::config::GUEST_OWNER_ID).await
    }

    fn scope(&self) -> ScopeFilter {
        ScopeFilter::for_calendar(self.calendar_id.clone())
    }

    /// Reload the cache from the backend.
    pub async fn load(&mut self) -> Result<()> {
        self.notes = self.adapter.list_notes(&self.scope()).await?;
        tracing::debug!(
            "Loaded {} notes for calendar {}",
            self.notes.len(),
            self.calendar_id
        );
        Ok(())
    }

    pub fn notes(&self) -> &[StickyNote] {
        &self.notes
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    pub fn get_note(&self, id: &str) -> Option<&StickyNote> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Notes anchored to the given date.
    pub fn get_notes_by_date(&self, date: NaiveDate) -> Vec<&StickyNote> {
        self.notes
            .iter()
            .filter(|n| n.date() == Some(date))
            .collect()
    }

    /// Undated notes with no canvas position, in manual order.
    pub fn inbox_notes(&self) -> Vec<&StickyNote> {
        let mut inbox: Vec<&StickyNote> = self
            .notes
            .iter()
            .filter(|n| n.placement.is_inbox())
            .collect();
        inbox.sort_by_key(|n| (n.sort_order.unwrap_or(i64::MAX), n.created_at));
        inbox
    }

    /// Undated notes placed on the free-form canvas.
    pub fn canvas_notes(&self) -> Vec<&StickyNote> {
        self.notes
            .iter()
            .filter(|n| matches!(n.placement, Placement::Canvas { .. }))
            .collect()
    }

    /// Crossed-out notes, any placement.
    pub fn struck_notes(&self) -> Vec<&StickyNote> {
        self.notes.iter().filter(|n| n.is_struck).collect()
    }

    fn require_note(&self, id: &str) -> Result<&StickyNote> {
        self.get_note(id)
            .ok_or_else(|| AppError::NoteNotFound(id.to_string()))
    }

    fn commit(&mut self, updated: StickyNote) {
        if let Some(existing) = self.notes.iter_mut().find(|n| n.id == updated.id) {
            *existing = updated;
        } else {
            self.notes.push(updated);
        }
    }

    /// Create a note. Exactly one placement is chosen by the caller; on a
    /// backend lacking the optional position/sort columns the same logical
    /// write is retried with those fields dropped (a canvas placement
    /// degrades to a plain inbox note).
    pub async fn add_note(
        &mut self,
        text: impl Into<String>,
        color: NoteColor,
        placement: Placement,
    ) -> Result<StickyNote> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AppError::Validation("Note text must not be empty".into()));
        }

        let mut placement = placement;
        if !self.capabilities.canvas_positions && matches!(placement, Placement::Canvas { .. }) {
            tracing::debug!("Backend lacks position columns, degrading canvas note to inbox");
            placement = Placement::Inbox;
        }

        loop {
            let req = InsertNoteRequest {
                calendar_id: self.calendar_id.clone(),
                owner_id: self.owner_id.clone(),
                text: text.clone(),
                color,
                placement,
                sort_order: None,
            };

            match self.adapter.insert_note(req).await {
                Ok(note) => {
                    tracing::info!("Created note {} in calendar {}", note.id, self.calendar_id);
                    self.commit(note.clone());
                    return Ok(note);
                }
                Err(AppError::SchemaMismatch { column }) => {
                    tracing::warn!(
                        "Backend rejected note insert, missing column {}; retrying without it",
                        column
                    );
                    if !downgrade_capability(&mut self.capabilities, &column) {
                        return Err(AppError::SchemaMismatch { column });
                    }
                    if !self.capabilities.canvas_positions {
                        placement = match placement {
                            Placement::Canvas { .. } => Placement::Inbox,
                            other => other,
                        };
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Text/color-only edit; does not touch placement or calendar.
    pub async fn update_note(
        &mut self,
        id: &str,
        text: Option<String>,
        color: Option<NoteColor>,
    ) -> Result<StickyNote> {
        self.require_note(id)?;

        if let Some(text) = &text {
            if text.trim().is_empty() {
                return Err(AppError::Validation("Note text must not be empty".into()));
            }
        }

        let note = self
            .adapter
            .update_note(
                id,
                NotePatch {
                    text,
                    color,
                    ..NotePatch::default()
                },
            )
            .await?;

        tracing::debug!("Updated note {}", id);
        self.commit(note.clone());
        Ok(note)
    }

    /// Toggle the crossed-out flag.
    pub async fn set_note_struck(&mut self, id: &str, is_struck: bool) -> Result<StickyNote> {
        self.require_note(id)?;

        let note = self
            .adapter
            .update_note(
                id,
                NotePatch {
                    is_struck: Some(is_struck),
                    ..NotePatch::default()
                },
            )
            .await?;

        self.commit(note.clone());
        Ok(note)
    }

    /// Move a note to a new date (or into the inbox with `None`).
    ///
    /// When both the old and new dates are set, every note directly
    /// connected to the moved one (one hop, never transitive) that itself
    /// has a date is shifted by the same day delta, so linked notes keep
    /// their relative offsets. Moving into or out of the inbox never
    /// shifts neighbors. Returns the full batch of updated notes; the
    /// cache is committed only once every write has succeeded.
    pub async fn move_note(
        &mut self,
        id: &str,
        new_date: Option<NaiveDate>,
        connections: &[NoteConnection],
        insert_index: Option<usize>,
    ) -> Result<Vec<StickyNote>> {
        let old_date = self.require_note(id)?.date();

        if old_date == new_date {
            tracing::debug!("Note {} already on requested date, skipping write", id);
            return Ok(Vec::new());
        }

        let days_diff = match (old_date, new_date) {
            (Some(old), Some(new)) => new.signed_duration_since(old).num_days(),
            _ => 0,
        };

        // Dated and inbox placements both clear any canvas position
        let placement = match new_date {
            Some(date) => Placement::Dated { date },
            None => Placement::Inbox,
        };
        let sort_order = match (new_date, insert_index) {
            (None, Some(index)) if self.capabilities.sort_order => Some(index as i64),
            _ => None,
        };

        let moved = self
            .adapter
            .update_note(
                id,
                NotePatch {
                    placement: Some(placement),
                    sort_order,
                    ..NotePatch::default()
                },
            )
            .await?;

        let mut updated = vec![moved];

        if days_diff != 0 {
            for connection in connections.iter().filter(|c| c.touches(id)) {
                let Some(neighbor_id) = connection.other_endpoint(id) else {
                    continue;
                };
                let Some(neighbor) = self.get_note(neighbor_id) else {
                    continue;
                };
                let Some(neighbor_date) = neighbor.date() else {
                    continue;
                };

                let shifted = neighbor_date
                    .checked_add_signed(Duration::days(days_diff))
                    .ok_or_else(|| {
                        AppError::Validation(format!(
                            "Shifted date out of range for note {neighbor_id}"
                        ))
                    })?;

                let neighbor_id = neighbor_id.to_string();
                let shifted_note = self
                    .adapter
                    .update_note(
                        &neighbor_id,
                        NotePatch {
                            placement: Some(Placement::Dated { date: shifted }),
                            ..NotePatch::default()
                        },
                    )
                    .await?;

                tracing::debug!(
                    "Shifted connected note {} by {} days",
                    neighbor_id,
                    days_diff
                );
                updated.push(shifted_note);
            }
        }

        for note in &updated {
            self.commit(note.clone());
        }

        tracing::info!(
            "Moved note {} ({} note(s) updated)",
            id,
            updated.len()
        );
        Ok(updated)
    }

    /// Place an undated note at a free-form canvas position. Degrades to a
    /// plain inbox note when the backend lacks the position columns.
    pub async fn move_note_to_canvas(&mut self, id: &str, x: f64, y: f64) -> Result<StickyNote> {
        self.require_note(id)?;

        let mut placement = if self.capabilities.canvas_positions {
            Placement::Canvas { x, y }
        } else {
            tracing::debug!("Backend lacks position columns, keeping note {} in inbox", id);
            Placement::Inbox
        };

        loop {
            let result = self
                .adapter
                .update_note(
                    id,
                    NotePatch {
                        placement: Some(placement),
                        ..NotePatch::default()
                    },
                )
                .await;

            match result {
                Ok(note) => {
                    self.commit(note.clone());
                    return Ok(note);
                }
                Err(AppError::SchemaMismatch { column }) => {
                    tracing::warn!(
                        "Backend rejected canvas move, missing column {}; retrying as inbox",
                        column
                    );
                    if !downgrade_capability(&mut self.capabilities, &column) {
                        return Err(AppError::SchemaMismatch { column });
                    }
                    placement = Placement::Inbox;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Move a note to another calendar. The caller must pair this with
    /// `ConnectionStore::remove_for_note` so no connection ends up crossing
    /// calendars. The note leaves this store's scope and cache.
    pub async fn move_note_to_calendar(
        &mut self,
        id: &str,
        calendar_id: impl Into<String>,
    ) -> Result<StickyNote> {
        self.require_note(id)?;
        let calendar_id = calendar_id.into();

        let note = self
            .adapter
            .update_note(
                id,
                NotePatch {
                    calendar_id: Some(calendar_id.clone()),
                    ..NotePatch::default()
                },
            )
            .await?;

        if calendar_id != self.calendar_id {
            self.notes.retain(|n| n.id != id);
        } else {
            self.commit(note.clone());
        }

        tracing::info!("Moved note {} to calendar {}", id, calendar_id);
        Ok(note)
    }

    /// Delete a note. Connections referencing it are the connection
    /// store's concern (`remove_for_note`).
    pub async fn delete_note(&mut self, id: &str) -> Result<()> {
        self.require_note(id)?;

        self.adapter.delete_note(id).await?;
        self.notes.retain(|n| n.id != id);

        tracing::info!("Deleted note {}", id);
        Ok(())
    }

    /// Persist manual inbox ordering after a drag within the list. The
    /// sequence is renumbered and every note whose order changed is
    /// written; the cache commits only after all writes succeed.
    pub async fn reorder_inbox(&mut self, id: &str, insert_index: usize) -> Result<()> {
        self.require_note(id)?;

        let mut sequence: Vec<String> = self.inbox_notes().iter().map(|n| n.id.clone()).collect();
        let Some(current) = sequence.iter().position(|n| n == id) else {
            return Err(AppError::Validation(format!("Note {id} is not in the inbox")));
        };

        sequence.remove(current);
        let index = insert_index.min(sequence.len());
        sequence.insert(index, id.to_string());

        if !self.capabilities.sort_order {
            // Order survives locally until the next reload
            tracing::debug!("Backend lacks sort_order column, skipping persist");
            for (order, note_id) in sequence.iter().enumerate() {
                if let Some(note) = self.notes.iter_mut().find(|n| &n.id == note_id) {
                    note.sort_order = Some(order as i64);
                }
            }
            return Ok(());
        }

        let mut updated = Vec::new();
        for (order, note_id) in sequence.iter().enumerate() {
            let order = order as i64;
            let unchanged = self
                .get_note(note_id)
                .map(|n| n.sort_order == Some(order))
                .unwrap_or(false);
            if unchanged {
                continue;
            }

            let note = self
                .adapter
                .update_note(
                    note_id,
                    NotePatch {
                        sort_order: Some(order),
                        ..NotePatch::default()
                    },
                )
                .await?;
            updated.push(note);
        }

        for note in updated {
            self.commit(note);
        }
        Ok(())
    }
}
