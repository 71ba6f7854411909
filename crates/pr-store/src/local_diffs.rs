//! Cached working-tree diff for a local review: one row per review,
//! overwritten on each refresh.

use chrono::Utc;
use pr_core::AppError;
use pr_core::model::{DiffStats, LocalDiffSnapshot};
use rusqlite::{OptionalExtension, Row, params};

use crate::Store;

fn row_to_snapshot(row: &Row) -> rusqlite::Result<LocalDiffSnapshot> {
    Ok(LocalDiffSnapshot {
        review_id: row.get("review_id")?,
        diff_text: row.get("diff_text")?,
        stats: DiffStats {
            tracked_changes: row.get("tracked_changes")?,
            untracked_files: row.get("untracked_files")?,
            staged_changes: row.get("staged_changes")?,
            unstaged_changes: row.get("unstaged_changes")?,
        },
        digest: row.get("digest")?,
        captured_at: row.get("captured_at")?,
    })
}

impl Store {
    /// Replace the cached diff snapshot for a review.
    pub async fn save_local_diff(
        &self,
        review_id: i64,
        diff_text: &str,
        stats: DiffStats,
        digest: &str,
    ) -> Result<LocalDiffSnapshot, AppError> {
        let conn = self.lock().await;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO local_diffs
                (review_id, diff_text, tracked_changes, untracked_files, staged_changes,
                 unstaged_changes, digest, captured_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
             ON CONFLICT(review_id) DO UPDATE SET
                diff_text = excluded.diff_text,
                tracked_changes = excluded.tracked_changes,
                untracked_files = excluded.untracked_files,
                staged_changes = excluded.staged_changes,
                unstaged_changes = excluded.unstaged_changes,
                digest = excluded.digest,
                captured_at = excluded.captured_at",
            params![
                review_id,
                diff_text,
                stats.tracked_changes,
                stats.untracked_files,
                stats.staged_changes,
                stats.unstaged_changes,
                digest,
                now,
            ],
        )?;
        fetch(&conn, review_id)?.ok_or_else(|| AppError::Storage("save_local_diff: row missing after upsert".into()))
    }

    pub async fn get_local_diff(&self, review_id: i64) -> Result<Option<LocalDiffSnapshot>, AppError> {
        let conn = self.lock().await;
        fetch(&conn, review_id)
    }
}

fn fetch(conn: &rusqlite::Connection, review_id: i64) -> Result<Option<LocalDiffSnapshot>, AppError> {
    conn.query_row(
        "SELECT * FROM local_diffs WHERE review_id = ?1",
        params![review_id],
        row_to_snapshot,
    )
    .optional()
    .map_err(Into::into)
}
