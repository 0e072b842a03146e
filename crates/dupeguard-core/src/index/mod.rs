//! The candidate index: persistent storage for reports, annotated with
//! their embeddings and indexed for geospatial, categorical, and temporal
//! pre-filtering.

mod migrations;

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use uuid::Uuid;

use crate::geo::haversine_distance_meters;
use crate::report::{
    ArchiveTombstone, DuplicateFeedback, FeedbackKind, Location, Report, ReportStatus,
    ScheduledDeletion, SimilarityDetails, Upvote,
};
use crate::{EngineError, Result};

/// Optional filters accepted by [`Storage::list`].
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub category: Option<String>,
    /// `Some(true)` only duplicates (soft or hard), `Some(false)` only
    /// independent reports, `None` no filter.
    pub is_duplicate: Option<bool>,
}

/// Persistent store of reports. Uses separate reader/writer connections so
/// every method takes `&self`, making `Storage` `Send + Sync` and usable
/// behind a plain `Arc` rather than `Arc<Mutex<Storage>>`.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl Storage {
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Opens (creating if needed) the SQLite database at `db_path`, or the
    /// platform default data directory when `None`.
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("com", "dupeguard", "core").ok_or_else(|| {
                    EngineError::Internal("could not determine project directories".to_string())
                })?;
                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                data_dir.join("dupeguard.db")
            }
        };

        let writer_conn = Connection::open(&path)?;
        Self::configure_connection(&writer_conn)?;
        migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    fn writer(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| EngineError::Internal("writer lock poisoned".to_string()))
    }

    fn reader(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| EngineError::Internal("reader lock poisoned".to_string()))
    }

    /// Persists a new report and its photo embeddings in one transaction.
    pub fn insert(&self, report: &Report) -> Result<()> {
        report.validate()?;
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;

        tx.execute(
            "INSERT INTO reports (
                id, reporter_id, lat, lon, category, severity, description,
                text_vector, text_provider_version, created_at, updated_at, status,
                duplicate_of, similarity_score, similarity_details,
                confirmation_count, dispute_count,
                scheduled_deletion_at, scheduled_deletion_reason,
                was_reclassified, reclassified_at, reclassification_reason,
                manually_merged, merged_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15,
                ?16, ?17,
                ?18, ?19,
                ?20, ?21, ?22,
                ?23, ?24
            )",
            params![
                report.id,
                report.reporter_id,
                report.location.lat,
                report.location.lon,
                report.category,
                report.severity,
                report.description,
                report.text_vector.as_ref().map(|v| vector_to_bytes(v)),
                report.text_provider_version,
                report.created_at.to_rfc3339(),
                report.updated_at.to_rfc3339(),
                report.status.as_db_str(),
                report.duplicate_of,
                report.similarity_score,
                report
                    .similarity_details
                    .map(|d| serde_json::to_string(&d))
                    .transpose()?,
                report.confirmation_count,
                report.dispute_count,
                report.scheduled_for_deletion.as_ref().map(|s| s.deletion_at.to_rfc3339()),
                report.scheduled_for_deletion.as_ref().map(|s| s.reason.clone()),
                report.was_reclassified as i64,
                report.reclassified_at.map(|t| t.to_rfc3339()),
                report.reclassification_reason,
                report.manually_merged as i64,
                report.merged_at.map(|t| t.to_rfc3339()),
            ],
        )?;

        for (position, (url, vector)) in report
            .photo_urls
            .iter()
            .zip(report.image_vectors.iter())
            .enumerate()
        {
            tx.execute(
                "INSERT INTO report_photos (report_id, position, photo_url, image_vector, provider_version)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    report.id,
                    position as i64,
                    url,
                    vector_to_bytes(vector),
                    report.image_provider_version.as_deref().unwrap_or("unknown")
                ],
            )?;
        }

        for upvote in &report.upvotes {
            tx.execute(
                "INSERT OR IGNORE INTO report_upvotes (report_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![report.id, upvote.user_id, upvote.timestamp.to_rfc3339()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Fetches a single report by id, or `None` if it does not exist.
    pub fn get(&self, id: &str) -> Result<Option<Report>> {
        let reader = self.reader()?;
        let Some(mut report) = query_report_row(&reader, id)? else {
            return Ok(None);
        };
        hydrate_photos(&reader, &mut report)?;
        hydrate_upvotes(&reader, &mut report)?;
        hydrate_feedback(&reader, &mut report)?;
        Ok(Some(report))
    }

    /// Lists reports matching the given filter, newest first.
    pub fn list(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let reader = self.reader()?;
        let mut sql = "SELECT id FROM reports WHERE 1=1".to_string();
        let mut query_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            query_params.push(Box::new(status.as_db_str().to_string()));
        }
        if let Some(category) = &filter.category {
            sql.push_str(" AND category = ?");
            query_params.push(Box::new(category.clone()));
        }
        match filter.is_duplicate {
            Some(true) => sql.push_str(" AND duplicate_of IS NOT NULL"),
            Some(false) => sql.push_str(" AND duplicate_of IS NULL"),
            None => {}
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut stmt = reader.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = query_params.iter().map(|p| p.as_ref()).collect();
        let ids: Vec<String> = stmt
            .query_map(param_refs.as_slice(), |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        drop(stmt);

        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(mut report) = query_report_row(&reader, &id)? {
                hydrate_photos(&reader, &mut report)?;
                hydrate_upvotes(&reader, &mut report)?;
                hydrate_feedback(&reader, &mut report)?;
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Returns reports eligible as duplicate candidates for `(location,
    /// category)`: same category, not resolved, not itself already
    /// duplicate-linked, created within the time window, then geo-filtered
    /// in application code to `max_distance_meters`.
    ///
    /// Excluding already-linked reports keeps every candidate a possible
    /// root original: linking a new report to one would otherwise chain
    /// `duplicate_of` through it instead of pointing at an un-linked report.
    pub fn candidates(
        &self,
        location: Location,
        category: &str,
        now: DateTime<Utc>,
        time_window_days: i64,
        max_distance_meters: f64,
    ) -> Result<Vec<Report>> {
        let cutoff = now - chrono::Duration::days(time_window_days);
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT id FROM reports
             WHERE category = ?1 AND status != 'RESOLVED' AND duplicate_of IS NULL
               AND created_at >= ?2",
        )?;
        let ids: Vec<String> = stmt
            .query_map(params![category, cutoff.to_rfc3339()], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        drop(stmt);

        let mut out = Vec::new();
        for id in ids {
            if let Some(mut report) = query_report_row(&reader, &id)? {
                if haversine_distance_meters(location, report.location) > max_distance_meters {
                    continue;
                }
                hydrate_photos(&reader, &mut report)?;
                hydrate_upvotes(&reader, &mut report)?;
                hydrate_feedback(&reader, &mut report)?;
                out.push(report);
            }
        }
        Ok(out)
    }

    /// Sets `duplicate_of` and similarity metadata on `source_id`.
    pub fn link(&self, source_id: &str, target_id: &str, details: &SimilarityDetails) -> Result<()> {
        let writer = self.writer()?;
        let updated = writer.execute(
            "UPDATE reports SET duplicate_of = ?1, similarity_score = ?2, similarity_details = ?3,
             status = 'DUPLICATE', updated_at = ?4 WHERE id = ?5",
            params![
                target_id,
                details.overall_score,
                serde_json::to_string(details)?,
                Utc::now().to_rfc3339(),
                source_id
            ],
        )?;
        if updated == 0 {
            return Err(EngineError::NotFound(format!("report {source_id} not found")));
        }
        Ok(())
    }

    /// Clears `duplicate_of` and similarity metadata, marking the report as
    /// reclassified back to an independent report.
    pub fn unlink(&self, id: &str, reason: &str, at: DateTime<Utc>) -> Result<()> {
        let writer = self.writer()?;
        let updated = writer.execute(
            "UPDATE reports SET duplicate_of = NULL, similarity_score = NULL, similarity_details = NULL,
             status = 'REPORTED', confirmation_count = 0, dispute_count = 0,
             was_reclassified = 1, reclassified_at = ?1, reclassification_reason = ?2, updated_at = ?1
             WHERE id = ?3",
            params![at.to_rfc3339(), reason, id],
        )?;
        if updated == 0 {
            return Err(EngineError::NotFound(format!("report {id} not found")));
        }
        Ok(())
    }

    /// Atomically rewrites every `duplicate_of = from_id` to `to_id`.
    pub fn relink_pointers(&self, from_id: &str, to_id: &str) -> Result<()> {
        let writer = self.writer()?;
        writer.execute(
            "UPDATE reports SET duplicate_of = ?1 WHERE duplicate_of = ?2",
            params![to_id, from_id],
        )?;
        Ok(())
    }

    pub fn schedule_deletion(&self, id: &str, at: DateTime<Utc>, reason: &str) -> Result<()> {
        let writer = self.writer()?;
        let updated = writer.execute(
            "UPDATE reports SET scheduled_deletion_at = ?1, scheduled_deletion_reason = ?2, updated_at = ?3
             WHERE id = ?4",
            params![at.to_rfc3339(), reason, Utc::now().to_rfc3339(), id],
        )?;
        if updated == 0 {
            return Err(EngineError::NotFound(format!("report {id} not found")));
        }
        Ok(())
    }

    pub fn cancel_deletion(&self, id: &str) -> Result<()> {
        let writer = self.writer()?;
        let updated = writer.execute(
            "UPDATE reports SET scheduled_deletion_at = NULL, scheduled_deletion_reason = NULL, updated_at = ?1
             WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )?;
        if updated == 0 {
            return Err(EngineError::NotFound(format!("report {id} not found")));
        }
        Ok(())
    }

    /// Reports whose scheduled deletion time has passed as of `now`.
    pub fn due_deletions(&self, now: DateTime<Utc>) -> Result<Vec<Report>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT id FROM reports WHERE scheduled_deletion_at IS NOT NULL AND scheduled_deletion_at <= ?1",
        )?;
        let ids: Vec<String> = stmt
            .query_map(params![now.to_rfc3339()], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        drop(stmt);

        let mut out = Vec::new();
        for id in ids {
            if let Some(report) = query_report_row(&reader, &id)? {
                out.push(report);
            }
        }
        Ok(out)
    }

    /// Writes the archive tombstone and removes the report in one transaction.
    pub fn archive_and_delete(&self, id: &str) -> Result<ArchiveTombstone> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;

        let (category, lat, lon, created_at, duplicate_of, confirmation_count, dispute_count): (
            String,
            f64,
            f64,
            String,
            Option<String>,
            u32,
            u32,
        ) = tx
            .query_row(
                "SELECT category, lat, lon, created_at, duplicate_of, confirmation_count, dispute_count
                 FROM reports WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| EngineError::NotFound(format!("report {id} not found")))?;

        let upvote_count: u32 = tx.query_row(
            "SELECT COUNT(*) FROM report_upvotes WHERE report_id = ?1",
            params![id],
            |row| row.get(0),
        )?;

        let deleted_at = Utc::now();
        let tombstone = ArchiveTombstone {
            original_id: id.to_string(),
            duplicate_of: duplicate_of
                .ok_or_else(|| EngineError::ValidationError("report has no duplicate_of to archive against".to_string()))?,
            category,
            location: Location { lat, lon },
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| EngineError::Internal(e.to_string()))?
                .with_timezone(&Utc),
            deleted_at,
            upvote_count,
            confirmation_count,
            dispute_count,
        };

        tx.execute(
            "INSERT INTO archived_duplicates (
                original_id, duplicate_of, category, lat, lon, created_at, deleted_at,
                upvote_count, confirmation_count, dispute_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                tombstone.original_id,
                tombstone.duplicate_of,
                tombstone.category,
                tombstone.location.lat,
                tombstone.location.lon,
                tombstone.created_at.to_rfc3339(),
                tombstone.deleted_at.to_rfc3339(),
                tombstone.upvote_count,
                tombstone.confirmation_count,
                tombstone.dispute_count,
            ],
        )?;

        tx.execute("DELETE FROM reports WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(tombstone)
    }

    /// Total number of archive tombstones ever written.
    pub fn count_archived(&self) -> Result<usize> {
        let reader = self.reader()?;
        let count: i64 = reader.query_row("SELECT COUNT(*) FROM archived_duplicates", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Looks up an archive tombstone by the original report's id.
    pub fn get_archive(&self, original_id: &str) -> Result<Option<ArchiveTombstone>> {
        let reader = self.reader()?;
        reader
            .query_row(
                "SELECT original_id, duplicate_of, category, lat, lon, created_at, deleted_at,
                        upvote_count, confirmation_count, dispute_count
                 FROM archived_duplicates WHERE original_id = ?1",
                params![original_id],
                |row| {
                    Ok(ArchiveTombstone {
                        original_id: row.get(0)?,
                        duplicate_of: row.get(1)?,
                        category: row.get(2)?,
                        location: Location {
                            lat: row.get(3)?,
                            lon: row.get(4)?,
                        },
                        created_at: parse_rfc3339(row.get::<_, String>(5)?)?,
                        deleted_at: parse_rfc3339(row.get::<_, String>(6)?)?,
                        upvote_count: row.get(7)?,
                        confirmation_count: row.get(8)?,
                        dispute_count: row.get(9)?,
                    })
                },
            )
            .optional()
            .map_err(EngineError::from)
    }

    /// Idempotently records an upvote. Returns `true` if a new row was
    /// inserted, `false` if the user had already upvoted.
    pub fn add_upvote(&self, report_id: &str, user_id: &str, at: DateTime<Utc>) -> Result<bool> {
        let writer = self.writer()?;
        let changed = writer.execute(
            "INSERT OR IGNORE INTO report_upvotes (report_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![report_id, user_id, at.to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Records a duplicate-upvote audit entry on the target report. Does
    /// not affect the target's primary upvote count.
    pub fn add_duplicate_upvote(&self, target_id: &str, user_id: &str, at: DateTime<Utc>) -> Result<bool> {
        let writer = self.writer()?;
        let changed = writer.execute(
            "INSERT OR IGNORE INTO duplicate_upvotes (report_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![target_id, user_id, at.to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Appends a feedback record and returns the updated distinct
    /// `(user_id, kind)` confirm/dispute counts.
    pub fn add_feedback(
        &self,
        report_id: &str,
        user_id: &str,
        kind: FeedbackKind,
        comment: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(u32, u32)> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;

        tx.execute(
            "INSERT INTO duplicate_feedback (report_id, user_id, kind, comment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![report_id, user_id, kind.as_db_str(), comment, at.to_rfc3339()],
        )?;

        let confirm_count: u32 = tx.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM duplicate_feedback WHERE report_id = ?1 AND kind = 'CONFIRM'",
            params![report_id],
            |row| row.get(0),
        )?;
        let dispute_count: u32 = tx.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM duplicate_feedback WHERE report_id = ?1 AND kind = 'DISPUTE'",
            params![report_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "UPDATE reports SET confirmation_count = ?1, dispute_count = ?2, updated_at = ?3 WHERE id = ?4",
            params![confirm_count, dispute_count, at.to_rfc3339(), report_id],
        )?;

        tx.commit()?;
        Ok((confirm_count, dispute_count))
    }

    /// Transfers `source`'s upvotes into `target`, marks `source` as merged
    /// and pointing at `target`, and rewrites any report pointing at
    /// `source` to point at `target` instead — all in one transaction.
    pub fn merge(&self, target_id: &str, source_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;

        if tx
            .query_row("SELECT 1 FROM reports WHERE id = ?1", params![target_id], |_| Ok(()))
            .optional()?
            .is_none()
        {
            return Err(EngineError::NotFound(format!("report {target_id} not found")));
        }
        if tx
            .query_row("SELECT 1 FROM reports WHERE id = ?1", params![source_id], |_| Ok(()))
            .optional()?
            .is_none()
        {
            return Err(EngineError::NotFound(format!("report {source_id} not found")));
        }

        tx.execute(
            "INSERT OR IGNORE INTO report_upvotes (report_id, user_id, created_at)
             SELECT ?1, user_id, created_at FROM report_upvotes WHERE report_id = ?2",
            params![target_id, source_id],
        )?;

        tx.execute(
            "UPDATE reports SET status = 'DUPLICATE', duplicate_of = ?1, similarity_score = 1.0,
             manually_merged = 1, merged_at = ?2, updated_at = ?2 WHERE id = ?3",
            params![target_id, at.to_rfc3339(), source_id],
        )?;

        tx.execute(
            "UPDATE reports SET duplicate_of = ?1 WHERE duplicate_of = ?2",
            params![target_id, source_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Updates a report's status, optionally cascading `RESOLVED` to every
    /// report currently duplicate-linked to it.
    pub fn update_status(&self, id: &str, status: ReportStatus, cascade: bool) -> Result<()> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;
        let now = Utc::now().to_rfc3339();

        let updated = tx.execute(
            "UPDATE reports SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_db_str(), now, id],
        )?;
        if updated == 0 {
            return Err(EngineError::NotFound(format!("report {id} not found")));
        }

        if cascade && status == ReportStatus::Resolved {
            tx.execute(
                "UPDATE reports SET status = ?1, updated_at = ?2 WHERE duplicate_of = ?3",
                params![status.as_db_str(), now, id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

fn vector_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn parse_rfc3339(s: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| EngineError::Internal(e.to_string()))
}

fn query_report_row(conn: &Connection, id: &str) -> Result<Option<Report>> {
    conn.query_row(
        "SELECT id, reporter_id, lat, lon, category, severity, description, text_vector,
                created_at, updated_at, status, duplicate_of, similarity_score, similarity_details,
                confirmation_count, dispute_count, scheduled_deletion_at, scheduled_deletion_reason,
                was_reclassified, reclassified_at, reclassification_reason, manually_merged, merged_at,
                text_provider_version
         FROM reports WHERE id = ?1",
        params![id],
        |row| {
            let status_str: String = row.get(10)?;
            let similarity_details_json: Option<String> = row.get(13)?;
            let text_vector: Option<Vec<u8>> = row.get(7)?;
            let scheduled_deletion_at: Option<String> = row.get(16)?;
            let scheduled_deletion_reason: Option<String> = row.get(17)?;
            let reclassified_at: Option<String> = row.get(19)?;
            let merged_at: Option<String> = row.get(22)?;
            let text_provider_version: Option<String> = row.get(23)?;

            Ok(Report {
                id: row.get(0)?,
                reporter_id: row.get(1)?,
                location: Location {
                    lat: row.get(2)?,
                    lon: row.get(3)?,
                },
                category: row.get(4)?,
                severity: row.get(5)?,
                description: row.get(6)?,
                photo_urls: Vec::new(),
                image_vectors: Vec::new(),
                text_vector: text_vector.map(|b| bytes_to_vector(&b)),
                text_provider_version,
                image_provider_version: None,
                created_at: row.get::<_, String>(8)?.parse().unwrap_or_else(|_| Utc::now()),
                updated_at: row.get::<_, String>(9)?.parse().unwrap_or_else(|_| Utc::now()),
                status: ReportStatus::from_db_str(&status_str).unwrap_or(ReportStatus::Reported),
                upvotes: Vec::new(),
                duplicate_of: row.get(11)?,
                similarity_score: row.get(12)?,
                similarity_details: similarity_details_json
                    .and_then(|s| serde_json::from_str(&s).ok()),
                duplicate_feedback: Vec::new(),
                confirmation_count: row.get(14)?,
                dispute_count: row.get(15)?,
                scheduled_for_deletion: match (scheduled_deletion_at, scheduled_deletion_reason) {
                    (Some(at), Some(reason)) => Some(ScheduledDeletion {
                        deletion_at: at.parse().unwrap_or_else(|_| Utc::now()),
                        reason,
                    }),
                    _ => None,
                },
                was_reclassified: row.get::<_, i64>(18)? != 0,
                reclassified_at: reclassified_at.and_then(|s| s.parse().ok()),
                reclassification_reason: row.get(20)?,
                manually_merged: row.get::<_, i64>(21)? != 0,
                merged_at: merged_at.and_then(|s| s.parse().ok()),
            })
        },
    )
    .optional()
    .map_err(EngineError::from)
}

fn hydrate_photos(conn: &Connection, report: &mut Report) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT photo_url, image_vector, provider_version FROM report_photos
         WHERE report_id = ?1 ORDER BY position",
    )?;
    let rows: Vec<(String, Vec<u8>, String)> = stmt
        .query_map(params![report.id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<std::result::Result<_, _>>()?;
    report.photo_urls = rows.iter().map(|(url, _, _)| url.clone()).collect();
    report.image_vectors = rows.iter().map(|(_, v, _)| bytes_to_vector(v)).collect();
    report.image_provider_version = rows.first().map(|(_, _, v)| v.clone());
    Ok(())
}

fn hydrate_upvotes(conn: &Connection, report: &mut Report) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT user_id, created_at FROM report_upvotes WHERE report_id = ?1 ORDER BY created_at",
    )?;
    report.upvotes = stmt
        .query_map(params![report.id], |row| {
            let ts: String = row.get(1)?;
            Ok(Upvote {
                user_id: row.get(0)?,
                timestamp: ts.parse().unwrap_or_else(|_| Utc::now()),
            })
        })?
        .collect::<std::result::Result<_, _>>()?;
    Ok(())
}

fn hydrate_feedback(conn: &Connection, report: &mut Report) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT user_id, kind, comment, created_at FROM duplicate_feedback WHERE report_id = ?1 ORDER BY created_at",
    )?;
    report.duplicate_feedback = stmt
        .query_map(params![report.id], |row| {
            let kind_str: String = row.get(1)?;
            let ts: String = row.get(3)?;
            Ok(DuplicateFeedback {
                user_id: row.get(0)?,
                kind: FeedbackKind::from_db_str(&kind_str).unwrap_or(FeedbackKind::Confirm),
                comment: row.get(2)?,
                timestamp: ts.parse().unwrap_or_else(|_| Utc::now()),
            })
        })?
        .collect::<std::result::Result<_, _>>()?;
    Ok(())
}

/// Generates a new opaque report id.
pub fn new_report_id() -> String {
    Uuid::new_v4().to_string()
}
