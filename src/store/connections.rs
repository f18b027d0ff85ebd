//! Connection store
//!
//! Undirected links between two notes in the same calendar. Creating a
//! connection for a pair that is already linked toggles the existing link
//! off instead of inserting a duplicate, and cross-calendar pairs are
//! rejected before any backend write.

use crate::database::models::{InsertConnectionRequest, NoteConnection, ScopeFilter, StickyNote};
use crate::error::{AppError, Result};
use crate::store::adapter::BackendAdapter;

/// Result of a toggle-style connection request.
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    /// A new connection was created.
    Added(NoteConnection),
    /// The pair was already linked; the existing connection was removed.
    Removed(String),
}

/// Store for the connections of a single calendar.
pub struct ConnectionStore<A: BackendAdapter> {
    adapter: A,
    calendar_id: String,
    connections: Vec<NoteConnection>,
}

impl<A: BackendAdapter> ConnectionStore<A> {
    pub fn new(adapter: A, calendar_id: impl Into<String>) -> Self {
        Self {
            adapter,
            calendar_id: calendar_id.into(),
            connections: Vec::new(),
        }
    }

    /// Reload the cache from the backend.
    pub async fn load(&mut self) -> Result<()> {
        let scope = ScopeFilter::for_calendar(self.calendar_id.clone());
        self.connections = self.adapter.list_connections(&scope).await?;
        tracing::debug!(
            "Loaded {} connections for calendar {}",
            self.connections.len(),
            self.calendar_id
        );
        Ok(())
    }

    pub fn connections(&self) -> &[NoteConnection] {
        &self.connections
    }

    /// Link two notes, or unlink them if the unordered pair is already
    /// connected. Both notes must belong to this store's calendar; the
    /// check runs before any backend write.
    pub async fn add_connection(
        &mut self,
        source: &StickyNote,
        target: &StickyNote,
    ) -> Result<ToggleOutcome> {
        if source.id == target.id {
            return Err(AppError::Validation(
                "Cannot connect a note to itself".into(),
            ));
        }

        // Toggle: a duplicate unordered pair deletes the existing link
        if let Some(existing) = self
            .connections
            .iter()
            .find(|c| c.links_pair(&source.id, &target.id))
        {
            let id = existing.id.clone();
            self.adapter.delete_connection(&id).await?;
            self.connections.retain(|c| c.id != id);
            tracing::info!("Toggled off connection {} ({} <-> {})", id, source.id, target.id);
            return Ok(ToggleOutcome::Removed(id));
        }

        if source.calendar_id != target.calendar_id {
            return Err(AppError::Validation(format!(
                "Cannot connect notes in different calendars ({} vs {})",
                source.calendar_id, target.calendar_id
            )));
        }
        if source.calendar_id != self.calendar_id {
            return Err(AppError::Validation(format!(
                "Notes belong to calendar {}, store is scoped to {}",
                source.calendar_id, self.calendar_id
            )));
        }

        let connection = self
            .adapter
            .insert_connection(InsertConnectionRequest {
                calendar_id: self.calendar_id.clone(),
                source_note_id: source.id.clone(),
                target_note_id: target.id.clone(),
            })
            .await?;

        tracing::info!(
            "Created connection {} ({} <-> {})",
            connection.id,
            source.id,
            target.id
        );
        self.connections.push(connection.clone());
        Ok(ToggleOutcome::Added(connection))
    }

    pub async fn delete_connection(&mut self, id: &str) -> Result<()> {
        if !self.connections.iter().any(|c| c.id == id) {
            return Err(AppError::ConnectionNotFound(id.to_string()));
        }

        self.adapter.delete_connection(id).await?;
        self.connections.retain(|c| c.id != id);

        tracing::info!("Deleted connection {}", id);
        Ok(())
    }

    /// Ids of the one-hop neighbors of a note, either direction.
    pub fn get_connected_notes(&self, note_id: &str) -> Vec<String> {
        self.connections
            .iter()
            .filter_map(|c| c.other_endpoint(note_id))
            .map(str::to_string)
            .collect()
    }

    /// All connection records touching a note, either direction.
    pub fn get_connections_for_note(&self, note_id: &str) -> Vec<&NoteConnection> {
        self.connections
            .iter()
            .filter(|c| c.touches(note_id))
            .collect()
    }

    /// Remove every connection touching a note. Used after a note delete
    /// or a move to another calendar. A connection the backend has already
    /// cascaded away counts as removed.
    pub async fn remove_for_note(&mut self, note_id: &str) -> Result<usize> {
        let touching: Vec<String> = self
            .connections
            .iter()
            .filter(|c| c.touches(note_id))
            .map(|c| c.id.clone())
            .collect();

        for id in &touching {
            match self.adapter.delete_connection(id).await {
                Ok(()) => {}
                Err(AppError::ConnectionNotFound(_)) => {
                    tracing::debug!("Connection {} already removed by backend", id);
                }
                Err(err) => return Err(err),
            }
        }

        let removed = touching.len();
        self.connections.retain(|c| !c.touches(note_id));

        if removed > 0 {
            tracing::info!("Removed {} connection(s) for note {}", removed, note_id);
        }
        Ok(removed)
    }
}
