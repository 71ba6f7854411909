//! Context file repository: user-pinned line ranges from files outside the diff.

use pr_core::AppError;
use pr_core::model::ContextFile;
use rusqlite::{OptionalExtension, Row, params};

use crate::Store;

fn row_to_context_file(row: &Row) -> rusqlite::Result<ContextFile> {
    Ok(ContextFile {
        id: row.get("id")?,
        review_id: row.get("review_id")?,
        file: row.get("file")?,
        line_start: row.get("line_start")?,
        line_end: row.get("line_end")?,
        label: row.get("label")?,
    })
}

impl Store {
    pub async fn add_context_file(
        &self,
        review_id: i64,
        file: &str,
        line_start: i64,
        line_end: i64,
        label: Option<&str>,
    ) -> Result<ContextFile, AppError> {
        if line_end < line_start {
            return Err(AppError::InvalidInput("line_end must be >= line_start".into()));
        }
        let conn = self.lock().await;
        conn.execute(
            "INSERT INTO context_files (review_id, file, line_start, line_end, label)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![review_id, file, line_start, line_end, label],
        )?;
        fetch(&conn, conn.last_insert_rowid())
    }

    pub async fn list_context_files(&self, review_id: i64) -> Result<Vec<ContextFile>, AppError> {
        let conn = self.lock().await;
        let mut stmt = conn.prepare(
            "SELECT * FROM context_files WHERE review_id = ?1 ORDER BY file ASC, line_start ASC",
        )?;
        let rows = stmt.query_map(params![review_id], row_to_context_file)?.collect::<Result<_, _>>()?;
        Ok(rows)
    }

    pub async fn list_context_files_for_file(
        &self,
        review_id: i64,
        file: &str,
    ) -> Result<Vec<ContextFile>, AppError> {
        let conn = self.lock().await;
        let mut stmt = conn.prepare(
            "SELECT * FROM context_files WHERE review_id = ?1 AND file = ?2 ORDER BY line_start ASC",
        )?;
        let rows =
            stmt.query_map(params![review_id, file], row_to_context_file)?.collect::<Result<_, _>>()?;
        Ok(rows)
    }

    pub async fn update_context_file_range(
        &self,
        id: i64,
        line_start: i64,
        line_end: i64,
    ) -> Result<ContextFile, AppError> {
        if line_end < line_start {
            return Err(AppError::InvalidInput("line_end must be >= line_start".into()));
        }
        let conn = self.lock().await;
        fetch(&conn, id)?;
        conn.execute(
            "UPDATE context_files SET line_start = ?2, line_end = ?3 WHERE id = ?1",
            params![id, line_start, line_end],
        )?;
        fetch(&conn, id)
    }

    pub async fn remove_context_file(&self, id: i64) -> Result<(), AppError> {
        let conn = self.lock().await;
        fetch(&conn, id)?;
        conn.execute("DELETE FROM context_files WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub async fn remove_all_context_files(&self, review_id: i64) -> Result<(), AppError> {
        let conn = self.lock().await;
        conn.execute("DELETE FROM context_files WHERE review_id = ?1", params![review_id])?;
        Ok(())
    }
}

fn fetch(conn: &rusqlite::Connection, id: i64) -> Result<ContextFile, AppError> {
    conn.query_row("SELECT * FROM context_files WHERE id = ?1", params![id], row_to_context_file)
        .optional()?
        .ok_or_else(|| AppError::not_found("context_file", id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_context_file_rejects_inverted_range() {
        let store = Store::open_in_memory().unwrap();
        let review = store.upsert_local_review("/tmp/repo", "sha1", None).await.unwrap();
        let err = store.add_context_file(review.id, "a.rs", 10, 5, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn list_context_files_for_file_orders_by_line_start() {
        let store = Store::open_in_memory().unwrap();
        let review = store.upsert_local_review("/tmp/repo", "sha1", None).await.unwrap();
        store.add_context_file(review.id, "a.rs", 20, 25, None).await.unwrap();
        store.add_context_file(review.id, "a.rs", 1, 5, None).await.unwrap();
        store.add_context_file(review.id, "b.rs", 1, 5, None).await.unwrap();
        let a = store.list_context_files_for_file(review.id, "a.rs").await.unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].line_start, 1);
    }

    #[tokio::test]
    async fn remove_all_context_files_clears_review() {
        let store = Store::open_in_memory().unwrap();
        let review = store.upsert_local_review("/tmp/repo", "sha1", None).await.unwrap();
        store.add_context_file(review.id, "a.rs", 1, 5, None).await.unwrap();
        store.add_context_file(review.id, "b.rs", 1, 5, None).await.unwrap();
        store.remove_all_context_files(review.id).await.unwrap();
        assert!(store.list_context_files(review.id).await.unwrap().is_empty());
    }
}
