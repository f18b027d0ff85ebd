//! Database schema and migrations
//!
//! This module handles database initialization and schema migrations.
//! Uses SQLite with WAL mode for better concurrency and crash safety.
//!
//! Migration 002 adds the optional canvas-position and inbox-ordering
//! columns; a database stopped at version 1 is a real instance of the
//! "backend lacking optional columns" case the note store degrades for.

use crate::error::Result;
use sqlx::{sqlite::SqlitePool, Row};

const MIGRATION_001_INITIAL: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    calendar_id TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    date TEXT,
    text TEXT NOT NULL,
    color TEXT NOT NULL DEFAULT 'yellow',
    is_struck INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notes_calendar ON notes(calendar_id);
CREATE INDEX IF NOT EXISTS idx_notes_date ON notes(date);
CREATE TABLE IF NOT EXISTS note_connections (
    id TEXT PRIMARY KEY,
    calendar_id TEXT NOT NULL,
    source_note_id TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    target_note_id TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_connections_calendar ON note_connections(calendar_id);
CREATE INDEX IF NOT EXISTS idx_connections_source ON note_connections(source_note_id);
CREATE INDEX IF NOT EXISTS idx_connections_target ON note_connections(target_note_id)
"#;

const MIGRATION_002_CANVAS_COLUMNS: &str = r#"
ALTER TABLE notes ADD COLUMN position_x REAL;
ALTER TABLE notes ADD COLUMN position_y REAL;
ALTER TABLE notes ADD COLUMN sort_order INTEGER
"#;

fn get_migrations() -> Vec<(i32, &'static str)> {
    vec![
        (1, MIGRATION_001_INITIAL),
        (2, MIGRATION_002_CANVAS_COLUMNS),
    ]
}

/// The latest schema version this build knows about.
pub const LATEST_SCHEMA_VERSION: i32 = 2;

/// Initialize database with the full schema.
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    migrate_to(pool, LATEST_SCHEMA_VERSION).await
}

/// Migrate the database up to `target_version`.
///
/// Exposed so tests can build a version-1 database that genuinely lacks
/// the optional position/sort columns.
pub async fn migrate_to(pool: &SqlitePool, target_version: i32) -> Result<()> {
    tracing::info!("Initializing database schema (target version {})", target_version);

    // Enable WAL mode for better performance and crash safety
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;

    // Enable foreign keys so connection rows cascade with their notes
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    // Create migrations table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Get current version
    let current_version: i32 = sqlx::query("SELECT COALESCE(MAX(version), 0) FROM migrations")
        .fetch_one(pool)
        .await?
        .get(0);

    tracing::info!("Current database version: {}", current_version);

    apply_migrations(pool, current_version, target_version).await?;

    tracing::info!("Database initialization complete");
    Ok(())
}

async fn apply_migrations(
    pool: &SqlitePool,
    current_version: i32,
    target_version: i32,
) -> Result<()> {
    let migrations = get_migrations();

    for (version, sql) in migrations {
        if version > current_version && version <= target_version {
            tracing::info!("Applying migration version {}", version);

            // Execute migration in a transaction
            let mut tx = pool.begin().await?;

            for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
                sqlx::query(statement).execute(&mut *tx).await?;
            }

            sqlx::query("INSERT INTO migrations (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::info!("Migration version {} applied successfully", version);
        }
    }

    Ok(())
}
