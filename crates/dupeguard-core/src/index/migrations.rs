//! Schema migration definitions for the candidate index.

use rusqlite::Connection;

/// A database migration.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema: reports, photos, upvotes, feedback, archive",
    up: MIGRATION_V1_UP,
}];

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    reporter_id TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    category TEXT NOT NULL,
    severity TEXT NOT NULL,
    description TEXT NOT NULL,
    text_vector BLOB,
    text_provider_version TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'REPORTED',
    duplicate_of TEXT REFERENCES reports(id),
    similarity_score REAL,
    similarity_details TEXT,
    confirmation_count INTEGER NOT NULL DEFAULT 0,
    dispute_count INTEGER NOT NULL DEFAULT 0,
    scheduled_deletion_at TEXT,
    scheduled_deletion_reason TEXT,
    was_reclassified INTEGER NOT NULL DEFAULT 0,
    reclassified_at TEXT,
    reclassification_reason TEXT,
    manually_merged INTEGER NOT NULL DEFAULT 0,
    merged_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_reports_candidate_prefilter
    ON reports(category, status, created_at);
CREATE INDEX IF NOT EXISTS idx_reports_duplicate_of ON reports(duplicate_of);
CREATE INDEX IF NOT EXISTS idx_reports_scheduled_deletion ON reports(scheduled_deletion_at);

CREATE TABLE IF NOT EXISTS report_photos (
    report_id TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    photo_url TEXT NOT NULL,
    image_vector BLOB NOT NULL,
    provider_version TEXT NOT NULL,
    PRIMARY KEY (report_id, position)
);

CREATE TABLE IF NOT EXISTS report_upvotes (
    report_id TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (report_id, user_id)
);

CREATE TABLE IF NOT EXISTS duplicate_upvotes (
    report_id TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (report_id, user_id)
);

CREATE TABLE IF NOT EXISTS duplicate_feedback (
    report_id TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    comment TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_feedback_report ON duplicate_feedback(report_id, kind, user_id);

CREATE TABLE IF NOT EXISTS archived_duplicates (
    original_id TEXT PRIMARY KEY,
    duplicate_of TEXT NOT NULL,
    category TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    created_at TEXT NOT NULL,
    deleted_at TEXT NOT NULL,
    upvote_count INTEGER NOT NULL,
    confirmation_count INTEGER NOT NULL,
    dispute_count INTEGER NOT NULL
);
"#;

pub fn apply_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);",
    )?;

    let current: u32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
        .unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current {
            tracing::info!(
                version = migration.version,
                description = migration.description,
                "applying migration"
            );
            conn.execute_batch(migration.up)?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [migration.version],
            )?;
        }
    }

    Ok(())
}
