//! Review repository: create/update/lookup/list/delete for both PR and local reviews.

use chrono::{DateTime, Utc};
use pr_core::AppError;
use pr_core::model::{Review, ReviewStatus, ReviewType};
use rusqlite::{OptionalExtension, Row, params};

use crate::Store;

fn row_to_review(row: &Row) -> rusqlite::Result<Review> {
    let review_type: String = row.get("review_type")?;
    let status: String = row.get("status")?;
    Ok(Review {
        id: row.get("id")?,
        review_type: if review_type == "pr" { ReviewType::Pr } else { ReviewType::Local },
        repository: row.get("repository")?,
        pr_number: row.get("pr_number")?,
        local_path: row.get("local_path")?,
        local_head_sha: row.get("local_head_sha")?,
        status: match status.as_str() {
            "draft" => ReviewStatus::Draft,
            "submitted" => ReviewStatus::Submitted,
            _ => ReviewStatus::Pending,
        },
        name: row.get("name")?,
        summary: row.get("summary")?,
        custom_instructions: row.get("custom_instructions")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        submitted_at: row.get("submitted_at")?,
    })
}

impl Store {
    /// Find-or-create a PR review keyed by `(repository, pr_number)` — the
    /// same idempotent shape as [`Self::upsert_local_review`], so repeated
    /// external ingestion against the same PR always resolves to one review.
    pub async fn upsert_pr_review(&self, repository: &str, pr_number: i64) -> Result<Review, AppError> {
        let conn = self.lock().await;
        if let Some(existing) = conn
            .query_row(
                "SELECT * FROM reviews WHERE review_type = 'pr' AND repository = ?1 AND pr_number = ?2",
                params![repository, pr_number],
                row_to_review,
            )
            .optional()?
        {
            return Ok(existing);
        }
        let now: DateTime<Utc> = Utc::now();
        conn.execute(
            "INSERT INTO reviews (review_type, repository, pr_number, status, created_at, updated_at)
             VALUES ('pr', ?1, ?2, 'pending', ?3, ?3)
             ON CONFLICT(pr_number, repository) DO NOTHING",
            params![repository, pr_number, now],
        )?;
        conn.query_row(
            "SELECT * FROM reviews WHERE review_type = 'pr' AND repository = ?1 AND pr_number = ?2",
            params![repository, pr_number],
            row_to_review,
        )
        .optional()?
        .ok_or_else(|| AppError::Storage("upsert_pr_review: row missing after insert".into()))
    }

    /// Find-or-create a local review keyed by `(local_path, local_head_sha)`.
    pub async fn upsert_local_review(
        &self,
        local_path: &str,
        local_head_sha: &str,
        branch: Option<&str>,
    ) -> Result<Review, AppError> {
        let conn = self.lock().await;
        if let Some(existing) = fetch_local(&conn, local_path, local_head_sha)? {
            return Ok(existing);
        }
        let now: DateTime<Utc> = Utc::now();
        conn.execute(
            "INSERT INTO reviews (review_type, local_path, local_head_sha, branch, status, created_at, updated_at)
             VALUES ('local', ?1, ?2, ?3, 'pending', ?4, ?4)
             ON CONFLICT(local_path, local_head_sha) DO NOTHING",
            params![local_path, local_head_sha, branch, now],
        )?;
        fetch_local(&conn, local_path, local_head_sha)?
            .ok_or_else(|| AppError::Storage("upsert_local_review: row missing after insert".into()))
    }

    pub async fn get_review(&self, id: i64) -> Result<Review, AppError> {
        let conn = self.lock().await;
        fetch_by_id(&conn, id)
    }

    pub async fn get_pr_review(&self, repository: &str, pr_number: i64) -> Result<Option<Review>, AppError> {
        let conn = self.lock().await;
        conn.query_row(
            "SELECT * FROM reviews WHERE review_type = 'pr' AND repository = ?1 AND pr_number = ?2",
            params![repository, pr_number],
            row_to_review,
        )
        .optional()
        .map_err(Into::into)
    }

    pub async fn get_local_review(
        &self,
        local_path: &str,
        local_head_sha: &str,
    ) -> Result<Option<Review>, AppError> {
        let conn = self.lock().await;
        fetch_local(&conn, local_path, local_head_sha)
    }

    /// Paged local-review listing, cursor on `updated_at` descending.
    pub async fn list_local_reviews(
        &self,
        before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<(Vec<Review>, bool), AppError> {
        let conn = self.lock().await;
        let fetch_limit = i64::from(limit) + 1;
        let mut stmt = conn.prepare(
            "SELECT * FROM reviews
             WHERE review_type = 'local' AND (?1 IS NULL OR updated_at < ?1)
             ORDER BY updated_at DESC LIMIT ?2",
        )?;
        let mut rows = stmt
            .query_map(params![before, fetch_limit], row_to_review)?
            .collect::<Result<Vec<_>, _>>()?;
        let has_more = rows.len() as i64 > i64::from(limit);
        rows.truncate(limit as usize);
        Ok((rows, has_more))
    }

    pub async fn update_review(
        &self,
        id: i64,
        status: Option<ReviewStatus>,
        summary: Option<&str>,
        name: Option<&str>,
        custom_instructions: Option<&str>,
    ) -> Result<Review, AppError> {
        let conn = self.lock().await;
        fetch_by_id(&conn, id)?;
        let now: DateTime<Utc> = Utc::now();
        let submitted_at = if matches!(status, Some(ReviewStatus::Submitted)) {
            Some(now)
        } else {
            None
        };
        conn.execute(
            "UPDATE reviews SET
                status = COALESCE(?2, status),
                summary = COALESCE(?3, summary),
                name = COALESCE(?4, name),
                custom_instructions = COALESCE(?5, custom_instructions),
                submitted_at = COALESCE(?6, submitted_at),
                updated_at = ?7
             WHERE id = ?1",
            params![
                id,
                status.map(|s| s.as_str()),
                summary,
                name,
                custom_instructions,
                submitted_at,
                now,
            ],
        )?;
        fetch_by_id(&conn, id)
    }

    pub async fn delete_review(&self, id: i64) -> Result<(), AppError> {
        let conn = self.lock().await;
        fetch_by_id(&conn, id)?;
        conn.execute("DELETE FROM reviews WHERE id = ?1", params![id])?;
        Ok(())
    }
}

fn fetch_by_id(conn: &rusqlite::Connection, id: i64) -> Result<Review, AppError> {
    conn.query_row("SELECT * FROM reviews WHERE id = ?1", params![id], row_to_review)
        .optional()?
        .ok_or_else(|| AppError::not_found("review", id.to_string()))
}

fn fetch_local(
    conn: &rusqlite::Connection,
    local_path: &str,
    local_head_sha: &str,
) -> Result<Option<Review>, AppError> {
    conn.query_row(
        "SELECT * FROM reviews WHERE review_type = 'local' AND local_path = ?1 AND local_head_sha = ?2",
        params![local_path, local_head_sha],
        row_to_review,
    )
    .optional()
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_local_review_is_find_or_create() {
        let store = Store::open_in_memory().unwrap();
        let first = store.upsert_local_review("/tmp/repo", "abc123", Some("main")).await.unwrap();
        let second = store.upsert_local_review("/tmp/repo", "abc123", Some("main")).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn upsert_local_review_distinct_head_sha_is_a_new_review() {
        let store = Store::open_in_memory().unwrap();
        let first = store.upsert_local_review("/tmp/repo", "abc123", None).await.unwrap();
        let second = store.upsert_local_review("/tmp/repo", "def456", None).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn get_review_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store.get_review(999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_review_status_and_summary() {
        let store = Store::open_in_memory().unwrap();
        let review = store.upsert_local_review("/tmp/repo", "abc123", None).await.unwrap();
        let updated = store
            .update_review(review.id, Some(ReviewStatus::Submitted), Some("looks good"), None, None)
            .await
            .unwrap();
        assert_eq!(updated.status, ReviewStatus::Submitted);
        assert_eq!(updated.summary.as_deref(), Some("looks good"));
        assert!(updated.submitted_at.is_some());
    }

    #[tokio::test]
    async fn delete_review_cascades() {
        let store = Store::open_in_memory().unwrap();
        let review = store.upsert_local_review("/tmp/repo", "abc123", None).await.unwrap();
        store.delete_review(review.id).await.unwrap();
        assert!(store.get_review(review.id).await.is_err());
    }

    #[tokio::test]
    async fn list_local_reviews_pages_by_updated_at() {
        let store = Store::open_in_memory().unwrap();
        for i in 0..3 {
            store.upsert_local_review("/tmp/repo", &format!("sha{i}"), None).await.unwrap();
        }
        let (page, has_more) = store.list_local_reviews(None, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(has_more);
    }
}
