//! Chat session repository, backing the machine protocol's conversational
//! tools: each session hangs off one comment, messages are append-only.

use chrono::Utc;
use pr_core::AppError;
use pr_core::model::{ChatMessage, ChatSession};
use rusqlite::{OptionalExtension, Row, params};

use crate::Store;

fn row_to_session(row: &Row) -> rusqlite::Result<ChatSession> {
    Ok(ChatSession {
        id: row.get("id")?,
        comment_id: row.get("comment_id")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_message(row: &Row) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        role: row.get("role")?,
        body: row.get("body")?,
        created_at: row.get("created_at")?,
    })
}

impl Store {
    pub async fn create_chat_session(&self, comment_id: i64) -> Result<ChatSession, AppError> {
        let conn = self.lock().await;
        conn.execute(
            "INSERT INTO chat_sessions (comment_id, status, created_at) VALUES (?1, 'active', ?2)",
            params![comment_id, Utc::now()],
        )?;
        fetch_session(&conn, conn.last_insert_rowid())
    }

    pub async fn get_chat_session(&self, id: i64) -> Result<ChatSession, AppError> {
        let conn = self.lock().await;
        fetch_session(&conn, id)
    }

    pub async fn update_chat_session_status(&self, id: i64, status: &str) -> Result<ChatSession, AppError> {
        let conn = self.lock().await;
        fetch_session(&conn, id)?;
        conn.execute("UPDATE chat_sessions SET status = ?2 WHERE id = ?1", params![id, status])?;
        fetch_session(&conn, id)
    }

    pub async fn append_chat_message(
        &self,
        session_id: i64,
        role: &str,
        body: &str,
    ) -> Result<ChatMessage, AppError> {
        if body.trim().is_empty() {
            return Err(AppError::InvalidInput("chat message body must not be empty".into()));
        }
        let conn = self.lock().await;
        fetch_session(&conn, session_id)?;
        conn.execute(
            "INSERT INTO chat_messages (session_id, role, body, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, role, body.trim(), Utc::now()],
        )?;
        fetch_message(&conn, conn.last_insert_rowid())
    }

    pub async fn list_chat_messages(&self, session_id: i64) -> Result<Vec<ChatMessage>, AppError> {
        let conn = self.lock().await;
        let mut stmt =
            conn.prepare("SELECT * FROM chat_messages WHERE session_id = ?1 ORDER BY id ASC")?;
        let rows = stmt.query_map(params![session_id], row_to_message)?.collect::<Result<_, _>>()?;
        Ok(rows)
    }

    pub async fn delete_chat_session(&self, id: i64) -> Result<(), AppError> {
        let conn = self.lock().await;
        fetch_session(&conn, id)?;
        conn.execute("DELETE FROM chat_sessions WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Comment ids that have at least one chat session with at least one message.
    pub async fn list_comments_with_chat(&self, review_id: i64) -> Result<Vec<i64>, AppError> {
        let conn = self.lock().await;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT c.comment_id
             FROM chat_sessions c
             JOIN comments cm ON cm.id = c.comment_id
             JOIN chat_messages m ON m.session_id = c.id
             WHERE cm.review_id = ?1
             ORDER BY c.comment_id ASC",
        )?;
        let rows = stmt.query_map(params![review_id], |row| row.get(0))?.collect::<Result<_, _>>()?;
        Ok(rows)
    }
}

fn fetch_session(conn: &rusqlite::Connection, id: i64) -> Result<ChatSession, AppError> {
    conn.query_row("SELECT * FROM chat_sessions WHERE id = ?1", params![id], row_to_session)
        .optional()?
        .ok_or_else(|| AppError::not_found("chat_session", id.to_string()))
}

fn fetch_message(conn: &rusqlite::Connection, id: i64) -> Result<ChatMessage, AppError> {
    conn.query_row("SELECT * FROM chat_messages WHERE id = ?1", params![id], row_to_message)
        .optional()?
        .ok_or_else(|| AppError::not_found("chat_message", id.to_string()))
}
