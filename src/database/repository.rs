//! Repository layer for database operations
//!
//! The concrete [`BackendAdapter`] over a SQLite pool. This is the single
//! place that knows which optional columns the schema carries: it probes
//! `pragma_table_info` once and reports typed capabilities, and it maps
//! SQLite missing-column failures to [`AppError::SchemaMismatch`] so no
//! caller ever matches on error strings.

use super::models::*;
use crate::error::{AppError, Result};
use crate::store::adapter::{BackendAdapter, BackendCapabilities};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    capabilities: Arc<OnceCell<BackendCapabilities>>,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            capabilities: Arc::new(OnceCell::new()),
        }
    }

    /// Probe the notes table for the optional columns added by later
    /// migrations. Cached for the lifetime of the repository.
    async fn schema_capabilities(&self) -> Result<BackendCapabilities> {
        let caps = self
            .capabilities
            .get_or_try_init(|| async {
                let columns: Vec<String> =
                    sqlx::query_scalar("SELECT name FROM pragma_table_info('notes')")
                        .fetch_all(&self.pool)
                        .await?;

                let caps = BackendCapabilities {
                    canvas_positions: columns.iter().any(|c| c == "position_x")
                        && columns.iter().any(|c| c == "position_y"),
                    sort_order: columns.iter().any(|c| c == "sort_order"),
                };

                tracing::debug!("Probed backend capabilities: {:?}", caps);
                Ok::<_, AppError>(caps)
            })
            .await?;

        Ok(*caps)
    }
}

/// Map SQLite write rejections to typed errors. Missing-column failures
/// become [`AppError::SchemaMismatch`] (safety net for schemas that drift
/// after the capability probe); any other database-level rejection, such
/// as a constraint violation, surfaces as [`AppError::Backend`] with the
/// engine's code and message. Non-database failures pass through.
fn translate_write_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        let message = db.message().to_string();
        if let Some(rest) = message.split("has no column named ").nth(1) {
            return AppError::SchemaMismatch {
                column: rest.trim().to_string(),
            };
        }
        if let Some(rest) = message.split("no such column: ").nth(1) {
            return AppError::SchemaMismatch {
                column: rest.trim().to_string(),
            };
        }
        return AppError::Backend {
            code: db
                .code()
                .map(|c| c.into_owned())
                .unwrap_or_else(|| "unknown".to_string()),
            message,
        };
    }
    AppError::from(err)
}

impl BackendAdapter for Repository {
    async fn capabilities(&self) -> Result<BackendCapabilities> {
        self.schema_capabilities().await
    }

    async fn list_notes(&self, scope: &ScopeFilter) -> Result<Vec<StickyNote>> {
        let mut query = "SELECT * FROM notes".to_string();
        let mut conditions = Vec::new();

        if scope.calendar_id.is_some() {
            conditions.push("calendar_id = ?");
        }
        if scope.owner_id.is_some() {
            conditions.push("owner_id = ?");
        }
        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }
        query.push_str(" ORDER BY created_at ASC");

        let mut q = sqlx::query_as::<_, NoteRow>(&query);
        if let Some(calendar_id) = &scope.calendar_id {
            q = q.bind(calendar_id);
        }
        if let Some(owner_id) = &scope.owner_id {
            q = q.bind(owner_id);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(NoteRow::into_note).collect()
    }

    async fn insert_note(&self, req: InsertNoteRequest) -> Result<StickyNote> {
        let caps = self.schema_capabilities().await?;

        if matches!(req.placement, Placement::Canvas { .. }) && !caps.canvas_positions {
            return Err(AppError::SchemaMismatch {
                column: "position_x".to_string(),
            });
        }
        if req.sort_order.is_some() && !caps.sort_order {
            return Err(AppError::SchemaMismatch {
                column: "sort_order".to_string(),
            });
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let (position_x, position_y) = match req.placement.position() {
            Some((x, y)) => (Some(x), Some(y)),
            None => (None, None),
        };

        let mut columns = vec![
            "id",
            "calendar_id",
            "owner_id",
            "date",
            "text",
            "color",
            "is_struck",
            "created_at",
            "updated_at",
        ];
        if caps.canvas_positions {
            columns.push("position_x");
            columns.push("position_y");
        }
        if caps.sort_order {
            columns.push("sort_order");
        }

        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO notes ({}) VALUES ({}) RETURNING *",
            columns.join(", "),
            placeholders
        );

        let mut q = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(&id)
            .bind(&req.calendar_id)
            .bind(&req.owner_id)
            .bind(req.placement.date())
            .bind(&req.text)
            .bind(req.color.as_str())
            .bind(false)
            .bind(now)
            .bind(now);
        if caps.canvas_positions {
            q = q.bind(position_x).bind(position_y);
        }
        if caps.sort_order {
            q = q.bind(req.sort_order);
        }

        let row = q.fetch_one(&self.pool).await.map_err(translate_write_error)?;

        tracing::debug!("Created note: {}", id);
        row.into_note()
    }

    async fn update_note(&self, id: &str, patch: NotePatch) -> Result<StickyNote> {
        let caps = self.schema_capabilities().await?;

        if let Some(placement) = &patch.placement {
            if matches!(placement, Placement::Canvas { .. }) && !caps.canvas_positions {
                return Err(AppError::SchemaMismatch {
                    column: "position_x".to_string(),
                });
            }
        }
        if patch.sort_order.is_some() && !caps.sort_order {
            return Err(AppError::SchemaMismatch {
                column: "sort_order".to_string(),
            });
        }

        let now = Utc::now();

        // Build dynamic update query
        let mut query = "UPDATE notes SET updated_at = ?".to_string();

        if patch.text.is_some() {
            query.push_str(", text = ?");
        }
        if patch.color.is_some() {
            query.push_str(", color = ?");
        }
        if patch.is_struck.is_some() {
            query.push_str(", is_struck = ?");
        }
        if patch.placement.is_some() {
            query.push_str(", date = ?");
            // Dated and inbox placements clear any stray canvas position
            if caps.canvas_positions {
                query.push_str(", position_x = ?, position_y = ?");
            }
        }
        if patch.calendar_id.is_some() {
            query.push_str(", calendar_id = ?");
        }
        if patch.sort_order.is_some() {
            query.push_str(", sort_order = ?");
        }

        query.push_str(" WHERE id = ? RETURNING *");

        let mut q = sqlx::query_as::<_, NoteRow>(&query).bind(now);
        if let Some(text) = &patch.text {
            q = q.bind(text);
        }
        if let Some(color) = &patch.color {
            q = q.bind(color.as_str());
        }
        if let Some(is_struck) = patch.is_struck {
            q = q.bind(is_struck);
        }
        if let Some(placement) = &patch.placement {
            q = q.bind(placement.date());
            if caps.canvas_positions {
                let (x, y) = match placement.position() {
                    Some((x, y)) => (Some(x), Some(y)),
                    None => (None, None),
                };
                q = q.bind(x).bind(y);
            }
        }
        if let Some(calendar_id) = &patch.calendar_id {
            q = q.bind(calendar_id);
        }
        if let Some(sort_order) = patch.sort_order {
            q = q.bind(sort_order);
        }
        q = q.bind(id);

        let row = q
            .fetch_optional(&self.pool)
            .await
            .map_err(translate_write_error)?
            .ok_or_else(|| AppError::NoteNotFound(id.to_string()))?;

        tracing::debug!("Updated note: {}", id);
        row.into_note()
    }

    async fn delete_note(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NoteNotFound(id.to_string()));
        }

        tracing::debug!("Deleted note: {}", id);
        Ok(())
    }

    async fn list_connections(&self, scope: &ScopeFilter) -> Result<Vec<NoteConnection>> {
        let mut query = "SELECT * FROM note_connections".to_string();
        if scope.calendar_id.is_some() {
            query.push_str(" WHERE calendar_id = ?");
        }
        query.push_str(" ORDER BY created_at ASC");

        let mut q = sqlx::query_as::<_, NoteConnection>(&query);
        if let Some(calendar_id) = &scope.calendar_id {
            q = q.bind(calendar_id);
        }

        let connections = q.fetch_all(&self.pool).await?;
        Ok(connections)
    }

    async fn insert_connection(&self, req: InsertConnectionRequest) -> Result<NoteConnection> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let connection = sqlx::query_as::<_, NoteConnection>(
            r#"
            INSERT INTO note_connections (id, calendar_id, source_note_id, target_note_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.calendar_id)
        .bind(&req.source_note_id)
        .bind(&req.target_note_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(translate_write_error)?;

        tracing::debug!(
            "Created connection: {} ({} <-> {})",
            id,
            req.source_note_id,
            req.target_note_id
        );
        Ok(connection)
    }

    async fn delete_connection(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM note_connections WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::ConnectionNotFound(id.to_string()));
        }

        tracing::debug!("Deleted connection: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::{initialize_database, migrate_to};
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn create_test_repo() -> Repository {
        let pool = memory_pool().await;
        initialize_database(&pool).await.unwrap();
        Repository::new(pool)
    }

    async fn create_v1_repo() -> Repository {
        let pool = memory_pool().await;
        migrate_to(&pool, 1).await.unwrap();
        Repository::new(pool)
    }

    fn dated_request(date: NaiveDate) -> InsertNoteRequest {
        InsertNoteRequest {
            calendar_id: "cal-1".to_string(),
            owner_id: "user-1".to_string(),
            text: "dentist".to_string(),
            color: NoteColor::Yellow,
            placement: Placement::Dated { date },
            sort_order: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_notes() {
        let repo = create_test_repo().await;
        let date = NaiveDate::from_ymd_opt(2025, 2, 5).unwrap();

        let note = repo.insert_note(dated_request(date)).await.unwrap();
        assert_eq!(note.placement, Placement::Dated { date });
        assert_eq!(note.text, "dentist");
        assert!(!note.is_struck);

        let notes = repo
            .list_notes(&ScopeFilter::for_calendar("cal-1"))
            .await
            .unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, note.id);

        let other = repo
            .list_notes(&ScopeFilter::for_calendar("cal-2"))
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_insert_canvas_note() {
        let repo = create_test_repo().await;

        let req = InsertNoteRequest {
            placement: Placement::Canvas { x: 120.5, y: -40.0 },
            ..dated_request(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
        };

        let note = repo.insert_note(req).await.unwrap();
        assert_eq!(note.placement, Placement::Canvas { x: 120.5, y: -40.0 });
        assert_eq!(note.date(), None);
    }

    #[tokio::test]
    async fn test_update_note_patch() {
        let repo = create_test_repo().await;
        let date = NaiveDate::from_ymd_opt(2025, 2, 5).unwrap();
        let note = repo.insert_note(dated_request(date)).await.unwrap();

        let updated = repo
            .update_note(
                &note.id,
                NotePatch {
                    text: Some("dentist appointment".to_string()),
                    color: Some(NoteColor::Pink),
                    ..NotePatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.text, "dentist appointment");
        assert_eq!(updated.color, NoteColor::Pink);
        // Untouched fields survive
        assert_eq!(updated.placement, Placement::Dated { date });
    }

    #[tokio::test]
    async fn test_dated_placement_clears_position() {
        let repo = create_test_repo().await;

        let req = InsertNoteRequest {
            placement: Placement::Canvas { x: 10.0, y: 20.0 },
            ..dated_request(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
        };
        let note = repo.insert_note(req).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let moved = repo
            .update_note(
                &note.id,
                NotePatch {
                    placement: Some(Placement::Dated { date }),
                    ..NotePatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(moved.placement, Placement::Dated { date });

        // Raw columns must be cleared, not just masked by normalization
        let (x, y): (Option<f64>, Option<f64>) =
            sqlx::query_as("SELECT position_x, position_y FROM notes WHERE id = ?")
                .bind(&note.id)
                .fetch_one(&repo.pool)
                .await
                .unwrap();
        assert_eq!(x, None);
        assert_eq!(y, None);
    }

    #[tokio::test]
    async fn test_update_missing_note() {
        let repo = create_test_repo().await;

        let result = repo
            .update_note(
                "nope",
                NotePatch {
                    text: Some("x".to_string()),
                    ..NotePatch::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::NoteNotFound(_))));
    }

    #[tokio::test]
    async fn test_v1_schema_reports_reduced_capabilities() {
        let repo = create_v1_repo().await;

        let caps = repo.capabilities().await.unwrap();
        assert!(!caps.canvas_positions);
        assert!(!caps.sort_order);
    }

    #[tokio::test]
    async fn test_v1_schema_rejects_canvas_insert_as_mismatch() {
        let repo = create_v1_repo().await;

        let req = InsertNoteRequest {
            placement: Placement::Canvas { x: 1.0, y: 2.0 },
            ..dated_request(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
        };

        let result = repo.insert_note(req).await;
        assert!(matches!(result, Err(AppError::SchemaMismatch { .. })));

        // A dated insert still works on the old schema
        let note = repo
            .insert_note(dated_request(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()))
            .await
            .unwrap();
        assert_eq!(note.sort_order, None);
    }

    #[tokio::test]
    async fn test_connection_crud_and_cascade() {
        let repo = create_test_repo().await;
        let date = NaiveDate::from_ymd_opt(2025, 2, 5).unwrap();
        let a = repo.insert_note(dated_request(date)).await.unwrap();
        let b = repo.insert_note(dated_request(date)).await.unwrap();

        let conn = repo
            .insert_connection(InsertConnectionRequest {
                calendar_id: "cal-1".to_string(),
                source_note_id: a.id.clone(),
                target_note_id: b.id.clone(),
            })
            .await
            .unwrap();

        let listed = repo
            .list_connections(&ScopeFilter::for_calendar("cal-1"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, conn.id);

        // Deleting an endpoint cascades the connection row
        repo.delete_note(&a.id).await.unwrap();
        let after = repo
            .list_connections(&ScopeFilter::for_calendar("cal-1"))
            .await
            .unwrap();
        assert!(after.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_connection() {
        let repo = create_test_repo().await;
        let result = repo.delete_connection("nope").await;
        assert!(matches!(result, Err(AppError::ConnectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_constraint_violation_surfaces_as_backend_error() {
        let repo = create_test_repo().await;

        // Both endpoints are missing, so the foreign key check rejects the
        // insert; the caller sees the engine's code/message pair
        let result = repo
            .insert_connection(InsertConnectionRequest {
                calendar_id: "cal-1".to_string(),
                source_note_id: "missing-a".to_string(),
                target_note_id: "missing-b".to_string(),
            })
            .await;

        match result {
            Err(AppError::Backend { code, message }) => {
                assert!(!code.is_empty());
                assert!(message.to_lowercase().contains("foreign key"));
            }
            other => panic!("expected Backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_translate_missing_column_error() {
        // Bypass the capability guard to exercise the safety net directly
        let repo = create_v1_repo().await;

        let err = sqlx::query("UPDATE notes SET position_x = 1.0 WHERE id = 'x'")
            .execute(&repo.pool)
            .await
            .unwrap_err();

        match translate_write_error(err) {
            AppError::SchemaMismatch { column } => assert_eq!(column, "position_x"),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }
}
