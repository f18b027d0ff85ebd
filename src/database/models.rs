//! Database models
//!
//! Rust structs representing the calendar entities. All models use serde
//! for serialization to a UI shell.
//!
//! A note's placement is a sum type chosen explicitly at construction and
//! move time, so the invalid "dated and canvas-positioned at once" state
//! cannot be represented. Raw rows (nullable date/position columns) are
//! normalized into [`Placement`] at the repository boundary.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Where a note lives: on a date, in the undated inbox, or free-floating
/// on the canvas at a content-space position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    Dated { date: NaiveDate },
    Inbox,
    Canvas { x: f64, y: f64 },
}

impl Placement {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Placement::Dated { date } => Some(*date),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            Placement::Canvas { x, y } => Some((*x, *y)),
            _ => None,
        }
    }

    pub fn is_inbox(&self) -> bool {
        matches!(self, Placement::Inbox)
    }
}

/// Sticky note color palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteColor {
    Yellow,
    Pink,
    Green,
    Blue,
    Orange,
    Purple,
}

impl NoteColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteColor::Yellow => "yellow",
            NoteColor::Pink => "pink",
            NoteColor::Green => "green",
            NoteColor::Blue => "blue",
            NoteColor::Orange => "orange",
            NoteColor::Purple => "purple",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "yellow" => Some(NoteColor::Yellow),
            "pink" => Some(NoteColor::Pink),
            "green" => Some(NoteColor::Green),
            "blue" => Some(NoteColor::Blue),
            "orange" => Some(NoteColor::Orange),
            "purple" => Some(NoteColor::Purple),
            _ => None,
        }
    }
}

impl Default for NoteColor {
    fn default() -> Self {
        NoteColor::Yellow
    }
}

/// A sticky note placed on the year grid, in the inbox, or on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickyNote {
    pub id: String,
    pub calendar_id: String,
    pub owner_id: String,
    pub placement: Placement,
    pub text: String,
    pub color: NoteColor,
    pub is_struck: bool,
    /// Manual ordering within the inbox list.
    pub sort_order: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StickyNote {
    pub fn date(&self) -> Option<NaiveDate> {
        self.placement.date()
    }
}

/// An undirected link between two notes in the same calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NoteConnection {
    pub id: String,
    pub calendar_id: String,
    pub source_note_id: String,
    pub target_note_id: String,
    pub created_at: DateTime<Utc>,
}

impl NoteConnection {
    /// Whether this connection touches the given note, in either direction.
    pub fn touches(&self, note_id: &str) -> bool {
        self.source_note_id == note_id || self.target_note_id == note_id
    }

    /// The other endpoint of the connection, if `note_id` is one of them.
    pub fn other_endpoint(&self, note_id: &str) -> Option<&str> {
        if self.source_note_id == note_id {
            Some(&self.target_note_id)
        } else if self.target_note_id == note_id {
            Some(&self.source_note_id)
        } else {
            None
        }
    }

    /// Whether this connection links the given unordered pair of notes.
    pub fn links_pair(&self, a: &str, b: &str) -> bool {
        (self.source_note_id == a && self.target_note_id == b)
            || (self.source_note_id == b && self.target_note_id == a)
    }
}

/// Insert request for a note.
#[derive(Debug, Clone, Deserialize)]
pub struct InsertNoteRequest {
    pub calendar_id: String,
    pub owner_id: String,
    pub text: String,
    pub color: NoteColor,
    pub placement: Placement,
    pub sort_order: Option<i64>,
}

/// Partial update for a note. Only the provided fields are written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotePatch {
    pub text: Option<String>,
    pub color: Option<NoteColor>,
    pub is_struck: Option<bool>,
    pub placement: Option<Placement>,
    pub calendar_id: Option<String>,
    pub sort_order: Option<i64>,
}

/// Insert request for a connection.
#[derive(Debug, Clone, Deserialize)]
pub struct InsertConnectionRequest {
    pub calendar_id: String,
    pub source_note_id: String,
    pub target_note_id: String,
}

/// Listing scope: which calendar and/or owner to load rows for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub calendar_id: Option<String>,
    pub owner_id: Option<String>,
}

impl ScopeFilter {
    pub fn for_calendar(calendar_id: impl Into<String>) -> Self {
        Self {
            calendar_id: Some(calendar_id.into()),
            owner_id: None,
        }
    }
}

/// Raw note row as stored. Optional columns decode as None when the
/// backend has not been migrated to include them.
#[derive(Debug, Clone, FromRow)]
pub struct NoteRow {
    pub id: String,
    pub calendar_id: String,
    pub owner_id: String,
    pub date: Option<NaiveDate>,
    pub text: String,
    pub color: String,
    pub is_struck: bool,
    #[sqlx(default)]
    pub position_x: Option<f64>,
    #[sqlx(default)]
    pub position_y: Option<f64>,
    #[sqlx(default)]
    pub sort_order: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteRow {
    /// Normalize the nullable columns into a placement. A date always wins
    /// over a stray position, so the exclusivity invariant holds even for
    /// rows written by older clients.
    pub fn into_note(self) -> crate::error::Result<StickyNote> {
        let placement = match (self.date, self.position_x, self.position_y) {
            (Some(date), _, _) => Placement::Dated { date },
            (None, Some(x), Some(y)) => Placement::Canvas { x, y },
            (None, _, _) => Placement::Inbox,
        };

        let color = NoteColor::parse(&self.color).ok_or_else(|| {
            crate::error::AppError::Generic(format!("Unknown note color: {}", self.color))
        })?;

        Ok(StickyNote {
            id: self.id,
            calendar_id: self.calendar_id,
            owner_id: self.owner_id,
            placement,
            text: self.text,
            color,
            is_struck: self.is_struck,
            sort_order: self.sort_order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: Option<NaiveDate>, x: Option<f64>, y: Option<f64>) -> NoteRow {
        NoteRow {
            id: "n1".to_string(),
            calendar_id: "c1".to_string(),
            owner_id: "u1".to_string(),
            date,
            text: "hello".to_string(),
            color: "yellow".to_string(),
            is_struck: false,
            position_x: x,
            position_y: y,
            sort_order: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_normalization() {
        let d = NaiveDate::from_ymd_opt(2025, 2, 5).unwrap();

        let dated = row(Some(d), None, None).into_note().unwrap();
        assert_eq!(dated.placement, Placement::Dated { date: d });

        let inbox = row(None, None, None).into_note().unwrap();
        assert_eq!(inbox.placement, Placement::Inbox);

        let canvas = row(None, Some(10.0), Some(20.0)).into_note().unwrap();
        assert_eq!(canvas.placement, Placement::Canvas { x: 10.0, y: 20.0 });
    }

    #[test]
    fn test_date_wins_over_stray_position() {
        let d = NaiveDate::from_ymd_opt(2025, 2, 5).unwrap();
        let note = row(Some(d), Some(1.0), Some(2.0)).into_note().unwrap();

        assert_eq!(note.placement, Placement::Dated { date: d });
        assert_eq!(note.placement.position(), None);
    }

    #[test]
    fn test_unknown_color_rejected() {
        let mut bad = row(None, None, None);
        bad.color = "chartreuse".to_string();
        assert!(bad.into_note().is_err());
    }

    #[test]
    fn test_connection_endpoints() {
        let conn = NoteConnection {
            id: "l1".to_string(),
            calendar_id: "c1".to_string(),
            source_note_id: "a".to_string(),
            target_note_id: "b".to_string(),
            created_at: Utc::now(),
        };

        assert!(conn.touches("a"));
        assert!(conn.touches("b"));
        assert!(!conn.touches("c"));
        assert_eq!(conn.other_endpoint("a"), Some("b"));
        assert_eq!(conn.other_endpoint("b"), Some("a"));
        assert!(conn.links_pair("b", "a"));
        assert!(!conn.links_pair("a", "c"));
    }
}
