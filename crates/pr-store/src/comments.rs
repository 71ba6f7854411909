//! Comment repository: user comments and AI suggestions share one table,
//! discriminated by `source`. Covers CRUD, the adopt/dismiss chain, and
//! bulk AI-suggestion ingestion with field normalization.

use chrono::Utc;
use pr_core::AppError;
use pr_core::model::{Comment, CommentSource, CommentStatus, Side};
use pr_provider::RawSuggestion;
use rusqlite::{OptionalExtension, Row, params};

use crate::Store;

fn row_to_comment(row: &Row) -> rusqlite::Result<Comment> {
    let source: String = row.get("source")?;
    let side: String = row.get("side")?;
    let status: String = row.get("status")?;
    Ok(Comment {
        id: row.get("id")?,
        review_id: row.get("review_id")?,
        source: if source == "ai" { CommentSource::Ai } else { CommentSource::User },
        author: row.get("author")?,
        ai_run_id: row.get("ai_run_id")?,
        ai_level: row.get("ai_level")?,
        ai_confidence: row.get("ai_confidence")?,
        reasoning: row.get("reasoning")?,
        file: row.get("file")?,
        line_start: row.get("line_start")?,
        line_end: row.get("line_end")?,
        side: if side == "LEFT" { Side::Left } else { Side::Right },
        diff_position: row.get("diff_position")?,
        is_file_level: row.get::<_, i64>("is_file_level")? != 0,
        comment_type: row.get("comment_type")?,
        title: row.get("title")?,
        body: row.get("body")?,
        commit_sha: row.get("commit_sha")?,
        status: match status.as_str() {
            "dismissed" => CommentStatus::Dismissed,
            "adopted" => CommentStatus::Adopted,
            "submitted" => CommentStatus::Submitted,
            "draft" => CommentStatus::Draft,
            "inactive" => CommentStatus::Inactive,
            _ => CommentStatus::Active,
        },
        parent_id: row.get("parent_id")?,
        adopted_as_id: row.get("adopted_as_id")?,
        voice_id: row.get("voice_id")?,
        is_raw: row.get::<_, i64>("is_raw")? != 0,
    })
}

impl Store {
    /// Create a user-authored line or file comment.
    pub async fn create_user_comment(
        &self,
        review_id: i64,
        file: &str,
        line_start: Option<i64>,
        line_end: Option<i64>,
        side: Side,
        comment_type: &str,
        body: &str,
    ) -> Result<Comment, AppError> {
        if body.trim().is_empty() {
            return Err(AppError::InvalidInput("comment body must not be empty".into()));
        }
        let conn = self.lock().await;
        let now = Utc::now();
        let line_end = line_end.or(line_start);
        conn.execute(
            "INSERT INTO comments
                (review_id, source, author, file, line_start, line_end, side, is_file_level,
                 comment_type, title, body, status, created_at, updated_at)
             VALUES (?1, 'user', 'user', ?2, ?3, ?4, ?5, ?6, ?7, '', ?8, 'active', ?9, ?9)",
            params![
                review_id,
                file,
                line_start,
                line_end,
                side.as_str(),
                line_start.is_none() as i64,
                comment_type,
                body.trim(),
                now
            ],
        )?;
        fetch(&conn, conn.last_insert_rowid())
    }

    pub async fn update_comment_body(&self, id: i64, body: &str) -> Result<Comment, AppError> {
        if body.trim().is_empty() {
            return Err(AppError::InvalidInput("comment body must not be empty".into()));
        }
        let conn = self.lock().await;
        fetch(&conn, id)?;
        conn.execute(
            "UPDATE comments SET body = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, body.trim(), Utc::now()],
        )?;
        fetch(&conn, id)
    }

    /// Soft-delete a comment. If it was the adoption of an AI suggestion,
    /// the suggestion transitions back to `dismissed` and its id is returned.
    pub async fn soft_delete_comment(&self, id: i64) -> Result<Option<i64>, AppError> {
        let conn = self.lock().await;
        let comment = fetch(&conn, id)?;
        let now = Utc::now();
        conn.execute(
            "UPDATE comments SET status = 'inactive', updated_at = ?2 WHERE id = ?1",
            params![id, now],
        )?;
        if let Some(parent_id) = comment.parent_id {
            conn.execute(
                "UPDATE comments SET status = 'dismissed', updated_at = ?2 WHERE id = ?1",
                params![parent_id, now],
            )?;
            return Ok(Some(parent_id));
        }
        Ok(None)
    }

    /// Soft-delete every active comment on a review; returns the distinct
    /// set of AI suggestion ids dismissed as a side effect.
    pub async fn bulk_soft_delete_by_review(&self, review_id: i64) -> Result<Vec<i64>, AppError> {
        let conn = self.lock().await;
        let now = Utc::now();
        let mut stmt = conn.prepare(
            "SELECT id, parent_id FROM comments WHERE review_id = ?1 AND source = 'user' AND status != 'inactive'",
        )?;
        let rows: Vec<(i64, Option<i64>)> = stmt
            .query_map(params![review_id], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<_, _>>()?;
        drop(stmt);

        conn.execute(
            "UPDATE comments SET status = 'inactive', updated_at = ?2
             WHERE review_id = ?1 AND source = 'user' AND status != 'inactive'",
            params![review_id, now],
        )?;

        let mut dismissed: Vec<i64> = rows.into_iter().filter_map(|(_, parent)| parent).collect();
        dismissed.sort_unstable();
        dismissed.dedup();
        for parent_id in &dismissed {
            conn.execute(
                "UPDATE comments SET status = 'dismissed', updated_at = ?2 WHERE id = ?1",
                params![parent_id, now],
            )?;
        }
        Ok(dismissed)
    }

    pub async fn restore_comment(&self, id: i64) -> Result<Comment, AppError> {
        let conn = self.lock().await;
        fetch(&conn, id)?;
        conn.execute(
            "UPDATE comments SET status = 'active', updated_at = ?2 WHERE id = ?1",
            params![id, Utc::now()],
        )?;
        fetch(&conn, id)
    }

    pub async fn list_comments(
        &self,
        review_id: i64,
        include_dismissed: bool,
    ) -> Result<Vec<Comment>, AppError> {
        let conn = self.lock().await;
        let mut stmt = if include_dismissed {
            conn.prepare("SELECT * FROM comments WHERE review_id = ?1 ORDER BY id ASC")?
        } else {
            conn.prepare(
                "SELECT * FROM comments WHERE review_id = ?1 AND status NOT IN ('inactive','dismissed') ORDER BY id ASC",
            )?
        };
        let rows = stmt.query_map(params![review_id], row_to_comment)?.collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Copy an AI suggestion's metadata into a new active user comment. If the
    /// suggestion already has an inactive adoption, reactivate it instead of
    /// creating a duplicate row.
    pub async fn adopt_suggestion(&self, suggestion_id: i64) -> Result<Comment, AppError> {
        let conn = self.lock().await;
        let suggestion = fetch(&conn, suggestion_id)?;
        let now = Utc::now();

        if let Some(existing_id) = suggestion.adopted_as_id {
            conn.execute(
                "UPDATE comments SET status = 'active', updated_at = ?2 WHERE id = ?1",
                params![existing_id, now],
            )?;
            conn.execute(
                "UPDATE comments SET status = 'adopted', updated_at = ?2 WHERE id = ?1",
                params![suggestion_id, now],
            )?;
            return fetch(&conn, existing_id);
        }

        conn.execute(
            "INSERT INTO comments
                (review_id, source, author, file, line_start, line_end, side, is_file_level,
                 comment_type, title, body, status, parent_id, created_at, updated_at)
             VALUES (?1, 'user', 'user', ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'active', ?10, ?11, ?11)",
            params![
                suggestion.review_id,
                suggestion.file,
                suggestion.line_start,
                suggestion.line_end,
                suggestion.side.as_str(),
                suggestion.is_file_level as i64,
                suggestion.comment_type,
                suggestion.title,
                suggestion.body,
                suggestion_id,
                now,
            ],
        )?;
        let new_id = conn.last_insert_rowid();
        conn.execute(
            "UPDATE comments SET status = 'adopted', adopted_as_id = ?2, updated_at = ?3 WHERE id = ?1",
            params![suggestion_id, new_id, now],
        )?;
        fetch(&conn, new_id)
    }

    /// Bulk-insert AI suggestions for one run, normalizing provider fields.
    /// `is_raw` is `true` for a voice's own output, `false` for a council's
    /// post-aggregation deduplicated set.
    pub async fn bulk_insert_suggestions(
        &self,
        review_id: i64,
        run_id: &str,
        level: Option<i64>,
        voice_id: Option<&str>,
        suggestions: &[RawSuggestion],
        is_raw: bool,
    ) -> Result<Vec<i64>, AppError> {
        let mut conn = self.lock().await;
        let now = Utc::now();
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(suggestions.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO comments
                    (review_id, source, author, ai_run_id, ai_level, ai_confidence, reasoning,
                     file, line_start, line_end, side, is_file_level, comment_type, title, body,
                     status, voice_id, is_raw, created_at, updated_at)
                 VALUES (?1,'ai','ai',?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,'active',?14,?15,?16,?16)",
            )?;
            for s in suggestions {
                if s.file.is_empty() || s.title.is_empty() {
                    return Err(AppError::InvalidInput(
                        "suggestion requires file, type, title, description".into(),
                    ));
                }
                stmt.execute(params![
                    review_id,
                    run_id,
                    level,
                    s.confidence,
                    s.reasoning,
                    s.file,
                    s.line_start,
                    s.line_end,
                    s.side.as_str(),
                    s.is_file_level as i64,
                    s.comment_type,
                    s.title,
                    s.body,
                    voice_id,
                    is_raw as i64,
                    now,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    pub async fn update_suggestion_status(
        &self,
        id: i64,
        status: CommentStatus,
        adopted_as_id: Option<i64>,
    ) -> Result<Comment, AppError> {
        let conn = self.lock().await;
        fetch(&conn, id)?;
        conn.execute(
            "UPDATE comments SET status = ?2, adopted_as_id = ?3, updated_at = ?4 WHERE id = ?1",
            params![id, status.as_str(), adopted_as_id, Utc::now()],
        )?;
        fetch(&conn, id)
    }
}

fn fetch(conn: &rusqlite::Connection, id: i64) -> Result<Comment, AppError> {
    conn.query_row("SELECT * FROM comments WHERE id = ?1", params![id], row_to_comment)
        .optional()?
        .ok_or_else(|| AppError::not_found("comment", id.to_string()))
}
