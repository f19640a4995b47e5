use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    helpers::{parse_datetime, parse_optional_datetime, to_score},
    models::StoredProgress,
    Database,
};
use crate::models::CompletionRecord;

fn row_to_progress(row: &Row) -> Result<StoredProgress> {
    let completed: i64 = row.get("completed")?;
    let attention_score: i64 = row.get("attention_score")?;
    let completed_at: Option<String> = row.get("completed_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(StoredProgress {
        record: CompletionRecord {
            course_id: row.get("course_id")?,
            lesson_id: row.get("lesson_id")?,
            completed: completed != 0,
            watched_fraction: row.get("watched_fraction")?,
            attention_score: to_score(attention_score)?,
            completed_at: parse_optional_datetime(completed_at, "completed_at")?,
        },
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Upsert keyed by `(course_id, lesson_id)`. A completed row is never
    /// downgraded by a later partial write, and coverage only grows.
    pub async fn save_progress(&self, record: &CompletionRecord, updated_at: DateTime<Utc>) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO lesson_progress
                    (course_id, lesson_id, completed, watched_fraction, attention_score, completed_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(course_id, lesson_id) DO UPDATE SET
                    completed = MAX(lesson_progress.completed, excluded.completed),
                    watched_fraction = MAX(lesson_progress.watched_fraction, excluded.watched_fraction),
                    attention_score = CASE
                        WHEN lesson_progress.completed = 1 AND excluded.completed = 0
                            THEN lesson_progress.attention_score
                        ELSE excluded.attention_score
                    END,
                    completed_at = COALESCE(lesson_progress.completed_at, excluded.completed_at),
                    updated_at = excluded.updated_at",
                params![
                    record.course_id,
                    record.lesson_id,
                    record.completed as i64,
                    record.watched_fraction,
                    i64::from(record.attention_score),
                    record.completed_at.map(|dt| dt.to_rfc3339()),
                    updated_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to save lesson progress")?;
            Ok(())
        })
        .await
    }

    pub async fn get_progress(&self, course_id: &str, lesson_id: &str) -> Result<Option<StoredProgress>> {
        let course_id = course_id.to_string();
        let lesson_id = lesson_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT course_id, lesson_id, completed, watched_fraction, attention_score, completed_at, updated_at
                 FROM lesson_progress
                 WHERE course_id = ?1 AND lesson_id = ?2",
            )?;

            let progress = stmt
                .query_row(params![course_id, lesson_id], |row| {
                    Ok(row_to_progress(row))
                })
                .optional()?
                .transpose()?;
            Ok(progress)
        })
        .await
    }

    pub async fn list_course_progress(&self, course_id: &str) -> Result<Vec<StoredProgress>> {
        let course_id = course_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT course_id, lesson_id, completed, watched_fraction, attention_score, completed_at, updated_at
                 FROM lesson_progress
                 WHERE course_id = ?1
                 ORDER BY lesson_id",
            )?;

            let mut rows = stmt.query(params![course_id])?;
            let mut progress = Vec::new();
            while let Some(row) = rows.next()? {
                progress.push(row_to_progress(row)?);
            }
            Ok(progress)
        })
        .await
    }

    /// Forget a lesson's progress, used when the learner replays it.
    pub async fn delete_progress(&self, course_id: &str, lesson_id: &str) -> Result<bool> {
        let course_id = course_id.to_string();
        let lesson_id = lesson_id.to_string();
        self.execute(move |conn| {
            let affected = conn
                .execute(
                    "DELETE FROM lesson_progress WHERE course_id = ?1 AND lesson_id = ?2",
                    params![course_id, lesson_id],
                )
                .with_context(|| "failed to delete lesson progress")?;
            Ok(affected > 0)
        })
        .await
    }
}
